use thiserror::Error;

use crate::{
    table::error::{ProtocolError, StringTableError},
    types::TableId,
};

/// Errors that can occur while managing the set of tables of one role
///
/// Creation errors are programmer errors and fatal to startup. Overflow
/// errors leave every table untouched, so the pass can be retried on the next
/// tick. Protocol errors end the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Tables can only be created while the creation window is open
    #[error("Can't create table {name}, table creation is closed")]
    WrongPhase { name: String },

    #[error("Table {name} already exists")]
    DuplicateName { name: String },

    #[error("Can't create table {name}, the container already holds {max} tables")]
    TooManyTables { name: String, max: usize },

    #[error("Invalid configuration for table {name}: {reason}")]
    InvalidConfiguration { name: String, reason: String },

    #[error("Rollback must be enabled before any table is created, {count} already exist")]
    RollbackAfterCreation { count: usize },

    /// A table's update didn't fit its scratch buffer or the outgoing message
    #[error("Update for table {table} doesn't fit, {bits} bits needed")]
    UpdateOverflow { table: String, bits: u32 },

    /// Baselines must carry every string of the table
    #[error("Baseline for table {table} wrote {written} of {expected} strings")]
    BaselineIncomplete {
        table: String,
        written: usize,
        expected: usize,
    },

    #[error("No table with id {table_id}")]
    TableNotFound { table_id: TableId },

    #[error(transparent)]
    Table(#[from] StringTableError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
