/// Most tables a container can hold; table ids are written in `MAX_TABLES_BITS`.
pub const MAX_TABLES: usize = 32;
pub const MAX_TABLES_BITS: u8 = 5;

/// Largest table capacity. Capacities must be powers of two up to this.
pub const MAX_TABLE_ENTRIES: u32 = 1 << 16;

/// Width of the length prefix of a variable payload.
pub const MAX_PAYLOAD_BITS: u8 = 14;
/// Largest variable payload, the most a `MAX_PAYLOAD_BITS` prefix can express.
pub const MAX_PAYLOAD_SIZE: usize = (1 << MAX_PAYLOAD_BITS) - 1;

pub const MIRROR_TABLE_MAX_COUNT: usize = 2;

/// Width of the history slot and shared-prefix fields.
pub const SUBSTRING_BITS: u8 = 5;
pub const MAX_HISTORY_CAPACITY: usize = 1 << SUBSTRING_BITS;
pub const MAX_SHARED_PREFIX: usize = (1 << SUBSTRING_BITS) - 1;

/// Baselines above this many entries are checked for dictionary coverage.
pub const DICTIONARY_COVERAGE_MIN_ENTRIES: usize = 20;

/// Payload revisions kept per item when rollback is enabled.
pub const MAX_CHANGE_HISTORY: usize = 32;
