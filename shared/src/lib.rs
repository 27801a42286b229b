//! # Netstrings Shared
//! Replicated string tables: a producer keeps named tables of strings with
//! optional payloads, and consumers are kept in sync with per-tick diffs,
//! compressed against a shared per-level dictionary.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use netstrings_serde::{
    BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, SignedInteger,
    SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger, NET_MAX_PAYLOAD_BITS,
    NET_MAX_PAYLOAD_BYTES,
};

mod config;
mod constants;
mod container;
mod dictionary;
mod table;
mod types;

pub use config::StringTableConfig;
pub use constants::{
    DICTIONARY_COVERAGE_MIN_ENTRIES, MAX_CHANGE_HISTORY, MAX_HISTORY_CAPACITY, MAX_PAYLOAD_BITS,
    MAX_PAYLOAD_SIZE, MAX_SHARED_PREFIX, MAX_TABLES, MAX_TABLES_BITS, MAX_TABLE_ENTRIES,
    MIRROR_TABLE_MAX_COUNT, SUBSTRING_BITS,
};
pub use container::{
    container::StringTableContainer,
    error::ContainerError,
    messages::{CreateStringTableMessage, UpdateStringTableMessage},
};
pub use dictionary::{
    dictionary::{is_compressed, normalized_hash, Dictionary},
    error::DictionaryError,
    manager::DictionaryManager,
    store::{
        DictionaryLocation, DictionaryStore, DirectoryDictionaryStore, MemoryDictionaryStore,
        DICTIONARY_FALLBACK_FILE, DICTIONARY_FILE, REFERENCE_LISTS_FOLDER,
    },
};
pub use table::{
    error::{ProtocolError, StringTableError},
    history::StringHistory,
    index::StringIndex,
    item::StringTableItem,
    item_list::ItemList,
    mirror::{new_mirror_table, MirrorTable},
    string_table::{
        entry_bits_for, PayloadLayout, StringChange, StringChangeCallback, StringTable,
        TableFlags,
    },
    table_reader::StringTableReader,
    table_writer::StringTableWriter,
};
pub use types::{TableId, TableRole, Tick, BASELINE_TICK};
