use thiserror::Error;

/// Errors that can occur while loading, decoding or persisting a dictionary
///
/// None of these are fatal to a session: a dictionary that fails to load is
/// treated as absent and tables encode literal strings instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    /// Buffer carries a zstd frame but compression support is compiled out
    #[error("Dictionary file is compressed, enable the `zstd_support` feature to read it")]
    Compressed,

    /// Compressed buffer could not be decoded
    #[error("Failed to decompress dictionary file of {payload_size} bytes: {message}")]
    Decompression { payload_size: usize, message: String },

    /// Rebuilt dictionary could not be compressed
    #[error("Failed to compress dictionary of {payload_size} bytes: {message}")]
    Compression { payload_size: usize, message: String },

    /// Level storage refuses writes
    #[error("Dictionary storage for level {level} is not writable")]
    NotWritable { level: String },

    /// Underlying storage failed
    #[error("Dictionary I/O failed for {path}: {message}")]
    Io { path: String, message: String },
}
