/// Scenario tests for a single table
/// Covers insert semantics, capacity, shape validation and the basic
/// producer to consumer transfer

use std::sync::Arc;

use netstrings_shared::{
    ContainerError, Dictionary, PayloadLayout, StringIndex, StringTableConfig,
    StringTableContainer, StringTableError, TableFlags, TableRole, BASELINE_TICK,
};
use netstrings_test::{empty_copy_of, new_table, transfer};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn two_models_reach_the_consumer() {
    init_logger();

    let mut producer = new_table(
        "models",
        16,
        PayloadLayout::Variable,
        TableFlags::NONE,
        Arc::new(Dictionary::empty()),
    );
    producer.insert(TableRole::Producer, "models/a.mdl", None).unwrap();
    producer.insert(TableRole::Producer, "models/b.mdl", None).unwrap();

    let mut consumer = empty_copy_of(&producer);
    let changed = transfer(&producer, &mut consumer, BASELINE_TICK).unwrap();

    assert_eq!(changed, 2);
    assert_eq!(consumer.num_strings(), 2);
    assert_eq!(consumer.find("models/b.mdl"), Some(StringIndex::Producer(1)));
}

#[test]
fn insert_twice_returns_same_index() {
    let mut table = new_table(
        "models",
        16,
        PayloadLayout::Variable,
        TableFlags::NONE,
        Arc::new(Dictionary::empty()),
    );

    let first = table.insert(TableRole::Producer, "models/a.mdl", None).unwrap();
    let count = table.num_strings();
    let second = table.insert(TableRole::Producer, "models/a.mdl", None).unwrap();

    assert_eq!(first, second);
    assert_eq!(table.num_strings(), count);
}

#[test]
fn insert_into_full_table() {
    let mut table = new_table(
        "models",
        8,
        PayloadLayout::Variable,
        TableFlags::NONE,
        Arc::new(Dictionary::empty()),
    );
    for i in 0..8 {
        table
            .insert(TableRole::Producer, &format!("models/{i}.mdl"), None)
            .unwrap();
    }

    let result = table.insert(TableRole::Producer, "models/overflow.mdl", None);

    assert!(matches!(result, Err(StringTableError::TableFull { .. })));
    assert_eq!(table.num_strings(), 8);
}

#[test]
fn table_sizes_must_be_powers_of_two() {
    let mut container = StringTableContainer::new(TableRole::Producer, StringTableConfig::default());
    container.allow_creation(true);

    for max_entries in [100, 1000, 3, 6, 65_535] {
        let result = container.create_table(
            &format!("bad_{max_entries}"),
            max_entries,
            PayloadLayout::Variable,
            TableFlags::NONE,
        );
        assert!(
            matches!(result, Err(ContainerError::InvalidConfiguration { .. })),
            "{max_entries} should be rejected"
        );
    }

    for max_entries in [1, 2, 256, 1024, 65_536] {
        let id = container
            .create_table(
                &format!("good_{max_entries}"),
                max_entries,
                PayloadLayout::Variable,
                TableFlags::NONE,
            )
            .unwrap();
        assert_eq!(container.table(id).unwrap().max_strings(), max_entries);
    }
}

#[test]
fn entry_bits_follow_capacity() {
    for (max_entries, bits) in [(1, 0), (2, 1), (16, 4), (1024, 10), (65_536, 16)] {
        let table = new_table(
            "sized",
            max_entries,
            PayloadLayout::Variable,
            TableFlags::NONE,
            Arc::new(Dictionary::empty()),
        );
        assert_eq!(table.entry_bits(), bits, "{max_entries}");
    }
}

#[test]
fn payload_change_sends_one_entry() {
    let mut producer = new_table(
        "models",
        16,
        PayloadLayout::Variable,
        TableFlags::NONE,
        Arc::new(Dictionary::empty()),
    );
    producer.insert(TableRole::Producer, "models/a.mdl", None).unwrap();
    producer.insert(TableRole::Producer, "models/b.mdl", None).unwrap();
    let mut consumer = empty_copy_of(&producer);
    transfer(&producer, &mut consumer, BASELINE_TICK).unwrap();

    producer.set_tick(4);
    producer
        .set_payload(StringIndex::Producer(1), Some(b"skin=2"))
        .unwrap();

    assert_eq!(transfer(&producer, &mut consumer, 0), Ok(1));
    assert_eq!(
        consumer.payload(StringIndex::Producer(1)),
        Some(&b"skin=2"[..])
    );
    assert_eq!(consumer.payload(StringIndex::Producer(0)), None);
}
