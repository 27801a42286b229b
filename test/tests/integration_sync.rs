/// Integration tests for container level synchronization
/// Covers baselines, incremental updates, dictionaries, rollback, snapshots
/// and level transitions

use std::sync::{Arc, Mutex};

use netstrings_serde::{BitReader, BitWriter};
use netstrings_shared::{
    ContainerError, Dictionary, DictionaryLocation, DictionaryStore, PayloadLayout, ProtocolError,
    StringIndex, TableFlags, TableRole,
};
use netstrings_test::{
    assert_tables_match, connect, exchange_updates, tick_and_exchange, TestConsumer, TestProducer,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const MODELS: [&str; 6] = [
    "models/player.mdl",
    "models/weapons/v_pistol.mdl",
    "models/weapons/v_rifle.mdl",
    "models/props/crate.mdl",
    "models/props/barrel.mdl",
    "models/gibs/wood_gib01.mdl",
];

#[test]
fn baseline_then_incremental_updates() {
    init_logger();

    let mut producer = TestProducer::new("de_test");
    let models = producer.create_table("modelprecache", 64, PayloadLayout::Variable, TableFlags::NONE);
    let lights = producer.create_table(
        "lightstyles",
        64,
        PayloadLayout::Fixed { bytes: 1, bits: 6 },
        TableFlags::NONE,
    );
    producer.insert(models, MODELS[0], None);
    producer.insert(lights, "m", Some(&[0x21]));

    let mut consumer = connect(&mut producer);
    assert_tables_match!(producer.table(models), consumer.table("modelprecache"));
    assert_tables_match!(producer.table(lights), consumer.table("lightstyles"));

    let tables = tick_and_exchange(&mut producer, &mut consumer, |producer| {
        for model in &MODELS[1..4] {
            producer.insert(models, model, None);
        }
    });
    assert_eq!(tables, 1);

    let tables = tick_and_exchange(&mut producer, &mut consumer, |producer| {
        producer.insert(models, MODELS[4], Some(b"bodygroup=1"));
        producer
            .table_mut(lights)
            .set_payload(StringIndex::Producer(0), Some(&[0x3F]))
            .unwrap();
    });
    assert_eq!(tables, 2);

    // quiet tick
    assert_eq!(tick_and_exchange(&mut producer, &mut consumer, |_| {}), 0);

    assert_tables_match!(producer.table(models), consumer.table("modelprecache"));
    assert_tables_match!(producer.table(lights), consumer.table("lightstyles"));
    assert_eq!(consumer.table("modelprecache").num_strings(), 5);
}

#[test]
fn late_consumer_catches_up_from_baseline() {
    let mut producer = TestProducer::new("de_test");
    let models = producer.create_table("modelprecache", 64, PayloadLayout::Variable, TableFlags::NONE);

    let mut early = connect(&mut producer);
    for model in MODELS {
        tick_and_exchange(&mut producer, &mut early, |producer| {
            producer.insert(models, model, Some(model.as_bytes()));
        });
    }

    producer.advance_tick();
    let late = connect(&mut producer);

    assert_tables_match!(producer.table(models), early.table("modelprecache"));
    assert_tables_match!(early.table("modelprecache"), late.table("modelprecache"));
}

#[test]
fn dictionary_strings_decode_identically() {
    init_logger();

    let mut producer = TestProducer::with_dictionary("de_dust", &MODELS[..4]);
    let models = producer.create_table(
        "modelprecache",
        64,
        PayloadLayout::Variable,
        TableFlags::DICTIONARY_ENABLED,
    );
    for model in MODELS {
        producer.insert(models, model, None);
    }
    assert_eq!(producer.dictionary().len(), 4);

    let consumer = connect(&mut producer);
    assert_tables_match!(producer.table(models), consumer.table("modelprecache"));

    // the same content costs more without the dictionary
    let table = producer.table(models);
    let mut with = BitWriter::new();
    table.write_update(&mut with, -1);
    let mut without = BitWriter::new();
    table.write_update_without_dictionary(&mut without, -1);
    assert!(with.bits_written() < without.bits_written());
}

#[test]
fn consumer_without_dictionary_rejects_dictionary_indices() {
    let mut producer = TestProducer::with_dictionary("de_dust", &MODELS);
    let models = producer.create_table(
        "modelprecache",
        64,
        PayloadLayout::Variable,
        TableFlags::DICTIONARY_ENABLED,
    );
    producer.insert(models, MODELS[2], None);

    let bytes = producer.baselines();
    let mut consumer = TestConsumer::new(Arc::new(Dictionary::empty()));

    assert!(matches!(
        consumer.receive_baselines(&bytes),
        Err(ContainerError::Protocol(
            ProtocolError::DictionaryIndexOutOfRange { .. }
        ))
    ));
}

#[test]
fn missing_dictionary_is_rebuilt_on_unload() {
    let mut producer = TestProducer::new("de_new");
    let models = producer.create_table(
        "modelprecache",
        64,
        PayloadLayout::Variable,
        TableFlags::DICTIONARY_ENABLED,
    );
    for model in MODELS {
        producer.insert(models, model, None);
    }

    let _ = producer.baselines();
    assert!(producer.dictionaries().has_pending_write());
    assert_eq!(producer.dictionaries().on_level_unloaded(), Ok(true));

    let raw = producer
        .dictionaries()
        .store()
        .read("de_new", DictionaryLocation::Primary)
        .expect("dictionary written");
    let dictionary = Dictionary::from_bytes(&raw).unwrap();
    assert_eq!(dictionary.len(), MODELS.len());
    assert_eq!(dictionary.find("MODELS\\PROPS\\CRATE.MDL"), Some(3));
}

#[test]
fn rollback_restores_earlier_payloads() {
    let mut producer = TestProducer::new("de_test");
    producer.container_mut().enable_rollback(true).unwrap();
    let models = producer.create_table("modelprecache", 16, PayloadLayout::Variable, TableFlags::NONE);

    let changes = Arc::new(Mutex::new(Vec::new()));
    let seen = changes.clone();
    producer.table_mut(models).set_change_callback(Box::new(move |change| {
        seen.lock().unwrap().push((change.name.to_string(), change.payload.map(<[u8]>::to_vec)));
    }));

    producer.advance_tick();
    producer.insert(models, "a", Some(&[1]));
    producer.advance_tick();
    producer.insert(models, "a", Some(&[2]));
    producer.advance_tick();
    producer.insert(models, "b", Some(&[3]));

    // callbacks are deferred while rollback is on
    assert!(changes.lock().unwrap().is_empty());
    producer.container_mut().trigger_callbacks(1);
    assert_eq!(
        *changes.lock().unwrap(),
        vec![
            ("a".to_string(), Some(vec![2])),
            ("b".to_string(), Some(vec![3])),
        ]
    );

    producer.container_mut().restore_tick(2);
    let table = producer.table(models);
    assert_eq!(table.payload(StringIndex::Producer(0)), Some(&[2][..]));
    assert_eq!(table.payload(StringIndex::Producer(1)), None);
    assert_eq!(table.last_changed_tick(), 2);

    producer.container_mut().restore_tick(1);
    assert_eq!(
        producer.table(models).payload(StringIndex::Producer(0)),
        Some(&[1][..])
    );
}

#[test]
fn snapshot_survives_a_restart() {
    let mut producer = TestProducer::new("de_test");
    let models = producer.create_table("modelprecache", 16, PayloadLayout::Variable, TableFlags::NONE);
    producer.advance_tick();
    for model in &MODELS[..3] {
        producer.insert(models, model, Some(b"x"));
    }

    let mut writer = BitWriter::new();
    producer.container().write_snapshots(&mut writer);
    let bytes = writer.to_bytes();

    let mut restored = TestProducer::new("de_test");
    restored.create_table("modelprecache", 16, PayloadLayout::Variable, TableFlags::NONE);
    restored
        .container_mut()
        .read_snapshots(&mut BitReader::new(&bytes))
        .unwrap();

    assert_tables_match!(producer.table(models), restored.table(0));
    assert_eq!(restored.table(0).last_changed_tick(), 1);
}

#[test]
fn level_change_recreates_tables() {
    let mut producer = TestProducer::new("de_one");
    let models = producer.create_table("modelprecache", 16, PayloadLayout::Variable, TableFlags::NONE);
    producer.insert(models, MODELS[0], None);
    producer.container_mut().allow_creation(false);

    let consumer = connect(&mut producer);
    assert_eq!(consumer.container().num_tables(), 1);

    producer.container_mut().remove_all_tables();
    producer.container_mut().allow_creation(true);
    let sounds = producer.create_table("soundprecache", 32, PayloadLayout::Variable, TableFlags::NONE);
    assert_eq!(sounds, 0);
    producer.insert(sounds, "ambient/wind.wav", None);

    let mut consumer_next = connect(&mut producer);
    assert_eq!(consumer_next.container().num_tables(), 1);
    assert!(consumer_next.container().find_table("modelprecache").is_none());
    assert_eq!(consumer_next.table("soundprecache").num_strings(), 1);

    producer.advance_tick();
    producer.insert(sounds, "ambient/rain.wav", None);
    assert_eq!(exchange_updates(&producer, &mut consumer_next), 1);
    assert_tables_match!(producer.table(sounds), consumer_next.table("soundprecache"));
}

#[test]
fn consumer_local_strings_stay_local() {
    let mut producer = TestProducer::new("de_test");
    let userinfo = producer.create_table("userinfo", 16, PayloadLayout::Variable, TableFlags::NONE);
    producer.insert(userinfo, "player1", Some(b"name=one"));
    let mut consumer = connect(&mut producer);

    producer
        .table_mut(userinfo)
        .set_allow_consumer_inserts(true);
    producer
        .table_mut(userinfo)
        .insert(TableRole::Consumer, "local_hint", None)
        .unwrap();

    assert_eq!(
        tick_and_exchange(&mut producer, &mut consumer, |producer| {
            producer.insert(userinfo, "player2", None);
        }),
        1
    );
    assert_eq!(consumer.table("userinfo").num_strings(), 2);
    assert_eq!(consumer.table("userinfo").find("local_hint"), None);
}
