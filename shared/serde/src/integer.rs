use crate::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, false, BITS>;
pub type SignedInteger<const BITS: u8> = SerdeInteger<true, false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, true, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, true, BITS>;

// Fixed-width values are written least significant bit first. Variable-width
// values are written as chunks of BITS bits, each preceded by a "more" bit.

fn write_chunk(writer: &mut dyn BitWrite, value: u64, bits: u8) {
    let mut value = value;
    for _ in 0..bits {
        writer.write_bit(value & 1 != 0);
        value >>= 1;
    }
}

fn read_chunk(reader: &mut BitReader, bits: u8) -> Result<u64, SerdeErr> {
    let mut output: u64 = 0;
    for i in 0..bits {
        if reader.read_bit()? {
            output |= 1 << i;
        }
    }
    Ok(output)
}

fn fits(value: u64, bits: u8) -> bool {
    bits >= 64 || value < (1u64 << bits)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    value: i64,
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> SerdeInteger<SIGNED, VARIABLE, BITS> {
    pub fn new<T: Into<i64>>(value: T) -> Self {
        let value = value.into();

        if BITS == 0 || BITS > 63 {
            panic!("can't create an integer with {} bits", BITS);
        }
        if !SIGNED && value < 0 {
            panic!("can't encode a negative number with an Unsigned Integer!");
        }
        if !VARIABLE && !fits(value.unsigned_abs(), BITS) {
            panic!("with {} bits, can't encode number {}", BITS, value);
        }

        Self { value }
    }

    pub fn get(&self) -> i64 {
        self.value
    }

    pub fn set<T: Into<i64>>(&mut self, value: T) {
        *self = Self::new(value);
    }

    pub fn to<T: TryFrom<i64>>(&self) -> Option<T> {
        T::try_from(self.value).ok()
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn ser(&self, writer: &mut dyn BitWrite) {
        if SIGNED {
            writer.write_bit(self.value < 0);
        }
        let mut magnitude = self.value.unsigned_abs();

        if VARIABLE {
            loop {
                let proceed = !fits(magnitude, BITS);
                writer.write_bit(proceed);
                write_chunk(writer, magnitude, BITS);
                magnitude >>= BITS;
                if !proceed {
                    return;
                }
            }
        } else {
            write_chunk(writer, magnitude, BITS);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let negative = SIGNED && reader.read_bit()?;

        let magnitude = if VARIABLE {
            let mut output: u64 = 0;
            let mut shift: u32 = 0;
            loop {
                let proceed = reader.read_bit()?;
                let chunk = read_chunk(reader, BITS)?;
                if shift >= 64 {
                    return Err(SerdeErr);
                }
                output |= chunk << shift;
                shift += BITS as u32;
                if !proceed {
                    break output;
                }
            }
        } else {
            read_chunk(reader, BITS)?
        };

        let value = i64::try_from(magnitude).map_err(|_| SerdeErr)?;
        Ok(Self {
            value: if negative { -value } else { value },
        })
    }

    fn bit_length(&self) -> u32 {
        let mut output: u32 = if SIGNED { 1 } else { 0 };

        if VARIABLE {
            let mut magnitude = self.value.unsigned_abs();
            loop {
                let proceed = !fits(magnitude, BITS);
                output += 1 + BITS as u32;
                magnitude >>= BITS;
                if !proceed {
                    break;
                }
            }
        } else {
            output += BITS as u32;
        }
        output
    }
}

impl<const SIGNED: bool, const BITS: u8> ConstBitLength for SerdeInteger<SIGNED, false, BITS> {
    fn const_bit_length() -> u32 {
        let sign: u32 = if SIGNED { 1 } else { 0 };
        sign + BITS as u32
    }
}

/// An unsigned integer whose width is only known at runtime, such as a table
/// entry index sized by the table's capacity.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct DynUnsignedInteger {
    value: u64,
    bits: u8,
}

impl DynUnsignedInteger {
    pub fn new(value: u64, bits: u8) -> Self {
        if bits > 64 {
            panic!("can't create an integer with {} bits", bits);
        }
        if !fits(value, bits) {
            panic!("with {} bits, can't encode number {}", bits, value);
        }
        Self { value, bits }
    }

    pub fn get(&self) -> u64 {
        self.value
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn ser(&self, writer: &mut dyn BitWrite) {
        write_chunk(writer, self.value, self.bits);
    }

    pub fn de(reader: &mut BitReader, bits: u8) -> Result<Self, SerdeErr> {
        if bits > 64 {
            return Err(SerdeErr);
        }
        let value = read_chunk(reader, bits)?;
        Ok(Self { value, bits })
    }

    pub fn bit_length(&self) -> u32 {
        self.bits as u32
    }
}
