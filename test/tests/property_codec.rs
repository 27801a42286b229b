/// PROPERTY-BASED TESTS: update codec invariants
///
/// Uses proptest to verify the table codec across random tables.
///
/// Key invariants:
/// 1. A baseline rebuilds the producer's ordered strings and payloads
/// 2. Incremental updates converge to the same state as one baseline
/// 3. Dictionary encoding never changes what is decoded
/// 4. Back-references are only used for prefixes of at least 3 bytes

use std::sync::Arc;

use proptest::prelude::*;

use netstrings_serde::{BitReader, BitWriter, Serde};
use netstrings_shared::{
    Dictionary, PayloadLayout, StringTable, TableFlags, TableRole, BASELINE_TICK,
};
use netstrings_test::{
    empty_copy_of, new_table, table_contents, transfer, transfer_without_dictionary,
};

type Op = (String, Option<Vec<u8>>);

fn name_strategy() -> impl Strategy<Value = String> {
    "(models|sound|materials)/[a-c]{1,3}/[a-z_]{1,8}\\.(mdl|wav|vmt)"
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (
        name_strategy(),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..12)),
    )
}

fn apply(table: &mut StringTable, ops: &[Op]) {
    for (name, payload) in ops {
        table
            .insert(TableRole::Producer, name, payload.as_deref())
            .unwrap();
    }
}

fn variable_table(dictionary: Arc<Dictionary>, flags: TableFlags) -> StringTable {
    new_table("props", 256, PayloadLayout::Variable, flags, dictionary)
}

fn shared_prefix(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

proptest! {
    /// A baseline reproduces the producer table in a fresh consumer
    #[test]
    fn prop_baseline_round_trip(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut producer = variable_table(Arc::new(Dictionary::empty()), TableFlags::NONE);
        apply(&mut producer, &ops);

        let mut consumer = empty_copy_of(&producer);
        let sent = transfer(&producer, &mut consumer, BASELINE_TICK).unwrap();

        prop_assert_eq!(sent, producer.num_strings());
        prop_assert_eq!(table_contents(&producer), table_contents(&consumer));
    }

    /// Fixed payloads survive the trip masked to their bit width
    #[test]
    fn prop_fixed_round_trip(
        ops in prop::collection::vec((name_strategy(), prop::option::of(any::<[u8; 2]>())), 1..32)
    ) {
        let mut producer = new_table(
            "lightstyles",
            64,
            PayloadLayout::Fixed { bytes: 2, bits: 11 },
            TableFlags::NONE,
            Arc::new(Dictionary::empty()),
        );
        for (name, payload) in &ops {
            producer
                .insert(TableRole::Producer, name, payload.as_ref().map(|p| &p[..]))
                .unwrap();
        }

        let mut consumer = empty_copy_of(&producer);
        transfer(&producer, &mut consumer, BASELINE_TICK).unwrap();

        prop_assert_eq!(table_contents(&producer), table_contents(&consumer));
        for (_, item) in consumer.items().iter() {
            if let Some(payload) = item.payload() {
                prop_assert_eq!(payload[1] & 0xF8, 0);
            }
        }
    }

    /// Tick-by-tick updates end in the same state as a single late baseline
    #[test]
    fn prop_incremental_matches_baseline(
        batches in prop::collection::vec(prop::collection::vec(op_strategy(), 0..8), 1..8)
    ) {
        let mut producer = variable_table(Arc::new(Dictionary::empty()), TableFlags::NONE);
        let mut incremental = empty_copy_of(&producer);
        let mut last_ack = BASELINE_TICK;

        for (tick, batch) in (1..).zip(batches.iter()) {
            producer.set_tick(tick);
            apply(&mut producer, batch);
            transfer(&producer, &mut incremental, last_ack).unwrap();
            last_ack = tick;
        }

        let mut late = empty_copy_of(&producer);
        transfer(&producer, &mut late, BASELINE_TICK).unwrap();

        prop_assert_eq!(table_contents(&producer), table_contents(&incremental));
        prop_assert_eq!(table_contents(&late), table_contents(&incremental));
    }

    /// Decoding with and without the dictionary yields the same strings
    #[test]
    fn prop_dictionary_is_transparent(
        ops in prop::collection::vec(op_strategy(), 1..48),
        known in prop::collection::vec(name_strategy(), 0..32),
    ) {
        let mut strings: Vec<String> = ops.iter().map(|(name, _)| name.clone()).step_by(2).collect();
        strings.extend(known);
        let dictionary = Arc::new(Dictionary::from_strings(&strings));

        let mut producer = variable_table(dictionary, TableFlags::DICTIONARY_ENABLED);
        apply(&mut producer, &ops);

        let mut with = empty_copy_of(&producer);
        transfer(&producer, &mut with, BASELINE_TICK).unwrap();
        let mut without = empty_copy_of(&producer);
        transfer_without_dictionary(&producer, &mut without, BASELINE_TICK).unwrap();

        prop_assert_eq!(table_contents(&with), table_contents(&without));
        prop_assert_eq!(table_contents(&producer), table_contents(&with));
    }

    /// A string is sent as a back-reference exactly when it shares at least
    /// 3 leading bytes with the one before it
    #[test]
    fn prop_short_prefixes_are_literal(
        first in "[ab/]{1,12}",
        second in "[ab/]{1,12}",
    ) {
        prop_assume!(first != second);

        let mut producer = variable_table(Arc::new(Dictionary::empty()), TableFlags::NONE);
        producer.insert(TableRole::Producer, &first, None).unwrap();
        producer.insert(TableRole::Producer, &second, None).unwrap();

        let mut writer = BitWriter::new();
        producer.write_update(&mut writer, BASELINE_TICK);
        let bytes = writer.to_bytes();
        let mut reader = BitReader::new(&bytes);

        // dictionary off
        prop_assert!(!reader.read_bit().unwrap());
        // first entry: sequential, new, literal, no payload
        prop_assert!(reader.read_bit().unwrap());
        prop_assert!(reader.read_bit().unwrap());
        prop_assert!(!reader.read_bit().unwrap());
        prop_assert_eq!(String::de(&mut reader).unwrap(), first.clone());
        prop_assert!(!reader.read_bit().unwrap());
        // second entry: sequential, new, then the back-reference flag
        prop_assert!(reader.read_bit().unwrap());
        prop_assert!(reader.read_bit().unwrap());
        let back_reference = reader.read_bit().unwrap();

        prop_assert_eq!(back_reference, shared_prefix(&first, &second) >= 3);
    }
}
