use thiserror::Error;

use netstrings_serde::SerdeErr;

use super::index::StringIndex;

/// Errors local to one table
///
/// These leave the table unchanged. Callers usually log them with `warn!` and
/// skip the offending string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StringTableError {
    /// Namespace already holds `max_entries` strings
    #[error("Table {table} is full ({max_entries} entries), can't add {string}")]
    TableFull {
        table: String,
        string: String,
        max_entries: u32,
    },

    /// Variable payload longer than the table accepts
    #[error("Payload of {size} bytes for {string} in table {table} exceeds the limit of {max} bytes")]
    PayloadTooLarge {
        table: String,
        string: String,
        size: usize,
        max: usize,
    },

    /// Fixed-size tables take payloads of exactly their configured size
    #[error("Table {table} expects {expected} payload bytes for {string}, got {size}")]
    PayloadSizeMismatch {
        table: String,
        string: String,
        size: usize,
        expected: usize,
    },

    /// Index does not address an existing string
    #[error("Table {table} has no string at {index}")]
    InvalidIndex { table: String, index: StringIndex },

    /// Table was created with an unusable shape
    #[error("Invalid configuration for table {table}: {reason}")]
    InvalidConfiguration { table: String, reason: String },

    /// A mirror can only grow by appending at its next free index
    #[error("Mirror {mirror} of table {table} holds {mirror_count} strings, can't place index {index}")]
    MirrorOutOfOrder {
        table: String,
        mirror: String,
        index: u32,
        mirror_count: usize,
    },

    /// Mirror lock was poisoned by a panicking writer
    #[error("Mirror slot {slot} of table {table} is unavailable")]
    MirrorUnavailable { table: String, slot: usize },

    #[error("Table {table} has no mirror slot {slot}")]
    InvalidMirrorSlot { table: String, slot: usize },

    /// Rollback tracking must be enabled before the first insert
    #[error("Can't enable rollback on table {table}, it already holds {count} strings")]
    RollbackNotEmpty { table: String, count: usize },

    #[error("Can't copy into table {table}, it already holds {count} strings")]
    CopyIntoNonEmpty { table: String, count: usize },
}

/// Errors decoding data sent by the producer
///
/// Any of these means the two sides have diverged. The connection must be
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Bogus string index {index} for table {table} (max {max_entries})")]
    IndexOutOfRange {
        table: String,
        index: u64,
        max_entries: u32,
    },

    /// New strings must land on the next free slot
    #[error("Table {table} can't grow to index {index}, it holds {count} strings")]
    NonSequentialGrowth {
        table: String,
        index: u32,
        count: usize,
    },

    #[error("New string at index {index} of table {table} arrived without a name")]
    MissingString { table: String, index: u32 },

    #[error("String {string} for index {index} of table {table} already exists at {existing}")]
    DuplicateString {
        table: String,
        string: String,
        index: u32,
        existing: u32,
    },

    #[error("String {received} for index {index} of table {table} doesn't match local {local}")]
    StringMismatch {
        table: String,
        index: u32,
        received: String,
        local: String,
    },

    #[error("Dictionary index {dictionary_index} for index {index} of table {table} is outside a dictionary of {dictionary_len} strings")]
    DictionaryIndexOutOfRange {
        table: String,
        index: u32,
        dictionary_index: u64,
        dictionary_len: usize,
    },

    #[error("History slot {slot} referenced by index {index} of table {table} is empty")]
    EmptyHistorySlot { table: String, index: u32, slot: u8 },

    #[error("Shared prefix of {length} bytes from history slot {slot} is invalid for index {index} of table {table}")]
    InvalidSubstring {
        table: String,
        index: u32,
        slot: u8,
        length: u8,
    },

    #[error("Payload of {length} bytes for index {index} of table {table} exceeds {max} bytes")]
    PayloadLengthExceeded {
        table: String,
        index: u32,
        length: usize,
        max: usize,
    },

    /// Decoded entry was refused by the local table
    #[error("Table {table} rejected update for index {index}: {reason}")]
    Rejected {
        table: String,
        index: u32,
        reason: String,
    },

    #[error("Update references unknown table {table}")]
    UnknownTable { table: String },

    #[error("Bit stream for table {table} ended early")]
    Truncated {
        table: String,
        #[source]
        source: SerdeErr,
    },

    #[error("Failed to create table {table} from baseline: {reason}")]
    TableCreation { table: String, reason: String },
}

impl ProtocolError {
    pub(crate) fn truncated(table: &str) -> impl FnOnce(SerdeErr) -> ProtocolError + '_ {
        move |source| ProtocolError::Truncated {
            table: table.to_string(),
            source,
        }
    }
}
