use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use log::warn;

use super::error::DictionaryError;

pub const DICTIONARY_FILE: &str = "stringtable_dictionary.dct";
pub const DICTIONARY_FALLBACK_FILE: &str = "stringtable_dictionary_fallback.dct";
pub const REFERENCE_LISTS_FOLDER: &str = "reslists";

/// Where a dictionary can be found for a level, in lookup order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DictionaryLocation {
    /// Shipped inside the level archive
    Primary,
    /// Default dictionary packed into the level archive by the level compiler
    Fallback,
    /// Loose per-level file in the reference lists folder
    Legacy,
}

impl DictionaryLocation {
    pub const SEARCH_ORDER: [DictionaryLocation; 3] = [
        DictionaryLocation::Primary,
        DictionaryLocation::Fallback,
        DictionaryLocation::Legacy,
    ];

    pub fn is_fallback(&self) -> bool {
        !matches!(self, DictionaryLocation::Primary)
    }
}

/// Storage that owns the bytes of level dictionaries
pub trait DictionaryStore: Send + Sync {
    fn read(&self, level: &str, location: DictionaryLocation) -> Option<Vec<u8>>;

    fn is_writable(&self, level: &str) -> bool;

    /// Replaces the primary dictionary of `level` and drops its fallback.
    fn write(&self, level: &str, bytes: &[u8]) -> Result<(), DictionaryError>;
}

/// Dictionaries laid out on disk as
/// `<root>/maps/<level>/stringtable_dictionary.dct`,
/// `<root>/maps/<level>/stringtable_dictionary_fallback.dct` and
/// `<root>/reslists/<level>.dict`.
pub struct DirectoryDictionaryStore {
    root: PathBuf,
}

impl DirectoryDictionaryStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn level_dir(&self, level: &str) -> PathBuf {
        self.root.join("maps").join(level)
    }

    pub fn path(&self, level: &str, location: DictionaryLocation) -> PathBuf {
        match location {
            DictionaryLocation::Primary => self.level_dir(level).join(DICTIONARY_FILE),
            DictionaryLocation::Fallback => self.level_dir(level).join(DICTIONARY_FALLBACK_FILE),
            DictionaryLocation::Legacy => self
                .root
                .join(REFERENCE_LISTS_FOLDER)
                .join(format!("{level}.dict")),
        }
    }
}

impl DictionaryStore for DirectoryDictionaryStore {
    fn read(&self, level: &str, location: DictionaryLocation) -> Option<Vec<u8>> {
        fs::read(self.path(level, location)).ok()
    }

    fn is_writable(&self, level: &str) -> bool {
        match fs::metadata(self.level_dir(level)) {
            Ok(metadata) => metadata.is_dir() && !metadata.permissions().readonly(),
            Err(_) => false,
        }
    }

    fn write(&self, level: &str, bytes: &[u8]) -> Result<(), DictionaryError> {
        if !self.is_writable(level) {
            return Err(DictionaryError::NotWritable {
                level: level.to_string(),
            });
        }

        let path = self.path(level, DictionaryLocation::Primary);
        fs::write(&path, bytes).map_err(|err| DictionaryError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        let fallback = self.path(level, DictionaryLocation::Fallback);
        if fallback.exists() {
            if let Err(err) = fs::remove_file(&fallback) {
                warn!(
                    "Dictionary: could not remove fallback {}: {}",
                    fallback.display(),
                    err
                );
            }
        }

        Ok(())
    }
}

/// In-process dictionary storage, for hosts that keep level archives in
/// memory.
#[derive(Default)]
pub struct MemoryDictionaryStore {
    files: RwLock<HashMap<(String, DictionaryLocation), Vec<u8>>>,
    read_only: bool,
}

impl MemoryDictionaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            read_only: true,
        }
    }

    pub fn insert(&self, level: &str, location: DictionaryLocation, bytes: Vec<u8>) {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.insert((level.to_string(), location), bytes);
    }

    pub fn contains(&self, level: &str, location: DictionaryLocation) -> bool {
        self.read(level, location).is_some()
    }
}

impl DictionaryStore for MemoryDictionaryStore {
    fn read(&self, level: &str, location: DictionaryLocation) -> Option<Vec<u8>> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.get(&(level.to_string(), location)).cloned()
    }

    fn is_writable(&self, _level: &str) -> bool {
        !self.read_only
    }

    fn write(&self, level: &str, bytes: &[u8]) -> Result<(), DictionaryError> {
        if self.read_only {
            return Err(DictionaryError::NotWritable {
                level: level.to_string(),
            });
        }
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.remove(&(level.to_string(), DictionaryLocation::Fallback));
        files.insert(
            (level.to_string(), DictionaryLocation::Primary),
            bytes.to_vec(),
        );
        Ok(())
    }
}
