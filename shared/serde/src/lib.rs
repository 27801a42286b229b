//! # Netstrings Serde
//! Bit-level writer, reader and the `Serde` trait used by the string-table codec.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod bit_counter;
mod bit_reader;
mod bit_writer;
mod error;
mod impls;
mod integer;
mod serde;

pub use bit_counter::BitCounter;
pub use bit_reader::BitReader;
pub use bit_writer::{BitWrite, BitWriter};
pub use error::SerdeErr;
pub use integer::{
    DynUnsignedInteger, SerdeInteger, SignedInteger, SignedVariableInteger, UnsignedInteger,
    UnsignedVariableInteger,
};
pub use serde::{ConstBitLength, Serde};

/// Largest payload a single network message may carry, in bytes.
pub const NET_MAX_PAYLOAD_BYTES: usize = 262_144 - 4;
pub const NET_MAX_PAYLOAD_BITS: u32 = (NET_MAX_PAYLOAD_BYTES * 8) as u32;
