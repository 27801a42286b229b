use std::{error::Error, fmt};

/// Returned when a read runs past the end of the stream or decodes an
/// impossible value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerdeErr;

impl fmt::Display for SerdeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error while serializing/deserializing bit stream")
    }
}

impl Error for SerdeErr {}
