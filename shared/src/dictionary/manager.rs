use std::sync::Arc;

use log::{debug, info, warn};

use crate::StringTableConfig;

use super::{
    dictionary::{compress, Dictionary},
    error::DictionaryError,
    store::{DictionaryLocation, DictionaryStore},
};

/// A rebuilt dictionary waiting for the level to unload before it is written.
struct PendingWrite {
    level: String,
    bytes: Vec<u8>,
}

/// Loads the dictionary for the current level and decides when it needs to be
/// regenerated.
pub struct DictionaryManager {
    store: Box<dyn DictionaryStore>,
    config: StringTableConfig,
    current_level: Option<String>,
    dictionary: Arc<Dictionary>,
    force_rebuild: bool,
    pending_write: Option<PendingWrite>,
}

impl DictionaryManager {
    pub fn new(store: Box<dyn DictionaryStore>, config: StringTableConfig) -> Self {
        Self {
            store,
            config,
            current_level: None,
            dictionary: Arc::new(Dictionary::empty()),
            force_rebuild: false,
            pending_write: None,
        }
    }

    /// Shared handle to the current dictionary, possibly empty.
    pub fn dictionary(&self) -> Arc<Dictionary> {
        self.dictionary.clone()
    }

    pub fn current_level(&self) -> Option<&str> {
        self.current_level.as_deref()
    }

    pub fn store(&self) -> &dyn DictionaryStore {
        self.store.as_ref()
    }

    pub fn clear(&mut self) {
        self.current_level = None;
        self.dictionary = Arc::new(Dictionary::empty());
    }

    /// Loads the dictionary for `level`, trying the primary file, the fallback
    /// file and then the legacy reference-list file. Returns false and leaves
    /// an empty dictionary when none can be used. Reloading the current level
    /// keeps the loaded dictionary.
    pub fn load(&mut self, level: &str) -> bool {
        self.force_rebuild = self.config.always_rebuild_dictionaries;

        if self.current_level.as_deref() == Some(level) {
            return self.dictionary.is_valid();
        }

        self.current_level = Some(level.to_string());
        self.dictionary = Arc::new(Dictionary::empty());

        if !self.config.use_dictionaries {
            debug!("Dictionary: dictionaries disabled, not loading one for {level}");
            return false;
        }

        for location in DictionaryLocation::SEARCH_ORDER {
            let Some(raw) = self.store.read(level, location) else {
                continue;
            };

            match Dictionary::from_bytes(&raw) {
                Ok(dictionary) => {
                    if location.is_fallback() {
                        warn!(
                            "Level {level} using {location:?} stringtable dictionary, rebuild it before shipping"
                        );
                    }
                    info!(
                        "Dictionary: loaded {} strings for {level} (crc {:08x})",
                        dictionary.len(),
                        dictionary.crc()
                    );
                    self.dictionary = Arc::new(dictionary.mark_fallback(location.is_fallback()));
                    return true;
                }
                Err(err) => {
                    warn!("Dictionary: {location:?} dictionary for {level} unusable: {err}");
                }
            }
        }

        warn!("Level {level} missing stringtable dictionary, rebuild it before shipping");
        false
    }

    /// Loads `level` and reports whether the local dictionary matches the
    /// checksum announced by the producer. Without an expected checksum the
    /// dictionary is assumed to match.
    pub fn on_level_load_start(&mut self, level: &str, expected_crc: Option<u32>) -> bool {
        self.pending_write = None;
        self.load(level);

        match expected_crc {
            Some(crc) => {
                let matches = crc == self.dictionary.crc();
                if !matches {
                    warn!(
                        "Dictionary: crc mismatch for {level}, local {:08x} remote {:08x}",
                        self.dictionary.crc(),
                        crc
                    );
                }
                matches
            }
            None => true,
        }
    }

    /// Whether the dictionary for `level` should be regenerated from the live
    /// tables and written back when the level unloads.
    pub fn should_rebuild(&self, level: &str) -> bool {
        let rebuild = self.force_rebuild
            || !self.dictionary.is_valid()
            || (self.dictionary.loaded_from_fallback() && self.config.generate_reference_lists);

        if rebuild {
            debug!(
                "Dictionary: {level} needs rebuild (forced: {}, loaded: {}, fallback: {})",
                self.force_rebuild,
                self.dictionary.is_valid(),
                self.dictionary.loaded_from_fallback()
            );
        }
        rebuild
    }

    /// Holds `body` until `on_level_unloaded`, so the write happens outside the
    /// per-tick path.
    pub fn cache_for_write_on_unload(&mut self, level: &str, body: Vec<u8>) {
        self.pending_write = Some(PendingWrite {
            level: level.to_string(),
            bytes: body,
        });
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending_write.is_some()
    }

    /// Writes a cached dictionary, if any. Returns whether one was written.
    pub fn on_level_unloaded(&mut self) -> Result<bool, DictionaryError> {
        let Some(pending) = self.pending_write.take() else {
            return Ok(false);
        };

        let packed = compress(&pending.bytes, self.config.dictionary_compression_level)?;
        self.store.write(&pending.level, &packed)?;

        info!(
            "Updated stringtable dictionary saved for {} ({} bytes)",
            pending.level,
            packed.len()
        );
        Ok(true)
    }
}
