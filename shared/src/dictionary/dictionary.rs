use std::collections::HashMap;

use log::debug;

use super::error::DictionaryError;

/// First four bytes of every zstd frame.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

cfg_if! {
    if #[cfg(feature = "zstd_support")]
    {
        fn decompress(raw: &[u8]) -> Result<Vec<u8>, DictionaryError> {
            zstd::stream::decode_all(raw).map_err(|err| DictionaryError::Decompression {
                payload_size: raw.len(),
                message: err.to_string(),
            })
        }

        pub(crate) fn compress(raw: &[u8], level: i32) -> Result<Vec<u8>, DictionaryError> {
            zstd::stream::encode_all(raw, level).map_err(|err| DictionaryError::Compression {
                payload_size: raw.len(),
                message: err.to_string(),
            })
        }
    }
    else
    {
        fn decompress(_raw: &[u8]) -> Result<Vec<u8>, DictionaryError> {
            Err(DictionaryError::Compressed)
        }

        pub(crate) fn compress(raw: &[u8], _level: i32) -> Result<Vec<u8>, DictionaryError> {
            Ok(raw.to_vec())
        }
    }
}

pub fn is_compressed(raw: &[u8]) -> bool {
    raw.starts_with(&ZSTD_MAGIC)
}

/// Hash used to match table strings against dictionary entries: separators
/// and case are normalized so `Models\Crate.mdl` and `models/crate.mdl`
/// collide.
pub fn normalized_hash(name: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for ch in name.chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        for lower in ch.to_lowercase() {
            let mut utf8 = [0u8; 4];
            hasher.update(lower.encode_utf8(&mut utf8).as_bytes());
        }
    }
    hasher.finalize()
}

/// Immutable per-level list of common strings, shared by every table of a
/// level through an `Arc`.
///
/// An empty dictionary is valid and simply disables dictionary encoding.
#[derive(Debug, Clone)]
pub struct Dictionary {
    entries: Vec<String>,
    hash_index: HashMap<u32, u32>,
    crc: u32,
    encode_bits: u8,
    loaded_from_fallback: bool,
}

impl Dictionary {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            hash_index: HashMap::new(),
            crc: 0,
            encode_bits: 1,
            loaded_from_fallback: false,
        }
    }

    /// Parses a dictionary file, decompressing it first if it carries a zstd
    /// frame. The checksum covers the decompressed bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, DictionaryError> {
        if is_compressed(raw) {
            let decompressed = decompress(raw)?;
            debug!(
                "Dictionary: decompressed {} bytes into {} bytes",
                raw.len(),
                decompressed.len()
            );
            return Ok(Self::parse(&decompressed));
        }
        Ok(Self::parse(raw))
    }

    /// Builds a dictionary the same way a file holding `strings` one per line
    /// would be parsed.
    pub fn from_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::parse(&Self::serialize(strings))
    }

    /// Newline-delimited file body for `strings`, skipping empty ones.
    pub fn serialize<I, S>(strings: I) -> Vec<u8>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buffer = Vec::new();
        for string in strings {
            let string = string.as_ref();
            if string.is_empty() {
                continue;
            }
            buffer.extend_from_slice(string.as_bytes());
            buffer.push(b'\n');
        }
        buffer
    }

    fn parse(raw: &[u8]) -> Self {
        let mut dictionary = Self::empty();
        dictionary.crc = crc32fast::hash(raw);

        for line in raw.split(|byte| *byte == b'\n' || *byte == 0) {
            let line = String::from_utf8_lossy(line);
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            let index = dictionary.entries.len() as u32;
            dictionary
                .hash_index
                .entry(normalized_hash(line))
                .or_insert(index);
            dictionary.entries.push(line.to_string());
        }

        let count = dictionary.entries.len() as u32;
        dictionary.encode_bits = if count == 0 {
            1
        } else {
            // floor(log2(count)) + 1
            (u32::BITS - count.leading_zeros()) as u8
        };

        dictionary
    }

    pub(crate) fn mark_fallback(mut self, loaded_from_fallback: bool) -> Self {
        self.loaded_from_fallback = loaded_from_fallback;
        self
    }

    /// Index of the entry whose normalized form matches `name`.
    pub fn find(&self, name: &str) -> Option<u32> {
        self.hash_index.get(&normalized_hash(name)).copied()
    }

    /// Like `find`, but only when the stored entry is byte-for-byte `name`,
    /// so decoding the index reproduces the exact string.
    pub fn find_exact(&self, name: &str) -> Option<u32> {
        let index = self.find(name)?;
        if self.lookup(index) == Some(name) {
            Some(index)
        } else {
            None
        }
    }

    pub fn lookup(&self, index: u32) -> Option<&str> {
        self.entries.get(index as usize).map(String::as_str)
    }

    pub fn is_valid(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Bits used for an explicit dictionary index on the wire.
    pub fn encode_bits(&self) -> u8 {
        self.encode_bits
    }

    pub fn loaded_from_fallback(&self) -> bool {
        self.loaded_from_fallback
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::empty()
    }
}
