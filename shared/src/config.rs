use std::default::Default;

use netstrings_serde::NET_MAX_PAYLOAD_BYTES;

use crate::constants::MAX_HISTORY_CAPACITY;

/// Contains Config properties used by string tables, their containers and the
/// dictionary manager
#[derive(Clone, Debug)]
pub struct StringTableConfig {
    /// Whether tables flagged for dictionary use may encode against the level
    /// dictionary. Turning this off also skips loading dictionaries.
    pub use_dictionaries: bool,
    /// Rebuild the level dictionary on every level load
    pub always_rebuild_dictionaries: bool,
    /// Set while generating reference lists; a dictionary loaded from a
    /// fallback file is then rebuilt
    pub generate_reference_lists: bool,
    /// Number of recently written strings available for prefix
    /// back-references. Capped at 32 by the 5-bit slot field.
    pub history_capacity: usize,
    /// Fewest shared leading bytes worth a back-reference
    pub min_substring_match: usize,
    /// Baselines hitting the dictionary for fewer than this share of entries
    /// log a rebuild warning
    pub dictionary_hit_warning_ratio: f32,
    /// Scratch budget for a single table's update, in bytes
    pub update_scratch_bytes: usize,
    /// Scratch budget for a single table's baseline, in bytes
    pub baseline_scratch_bytes: usize,
    /// Log the size of every baseline written
    pub dump_tables: bool,
    /// zstd level used when writing a rebuilt dictionary
    pub dictionary_compression_level: i32,
}

impl StringTableConfig {
    pub(crate) fn history_capacity(&self) -> usize {
        self.history_capacity.clamp(1, MAX_HISTORY_CAPACITY)
    }
}

impl Default for StringTableConfig {
    fn default() -> Self {
        Self {
            use_dictionaries: true,
            always_rebuild_dictionaries: false,
            generate_reference_lists: false,
            history_capacity: MAX_HISTORY_CAPACITY,
            min_substring_match: 3,
            dictionary_hit_warning_ratio: 0.9,
            update_scratch_bytes: NET_MAX_PAYLOAD_BYTES,
            baseline_scratch_bytes: 131_072,
            dump_tables: false,
            dictionary_compression_level: 3,
        }
    }
}
