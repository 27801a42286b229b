use crate::SerdeErr;

pub struct BitReader<'b> {
    buffer: &'b [u8],
    bit_index: usize,
    bit_length: usize,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self::with_bit_length(buffer, buffer.len() * 8)
    }

    /// A reader that stops after `bit_length` bits even if `buffer` is longer.
    pub fn with_bit_length(buffer: &'b [u8], bit_length: usize) -> Self {
        Self {
            buffer,
            bit_index: 0,
            bit_length: bit_length.min(buffer.len() * 8),
        }
    }

    pub fn bits_read(&self) -> usize {
        self.bit_index
    }

    pub fn bits_remaining(&self) -> usize {
        self.bit_length - self.bit_index
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        if self.bit_index >= self.bit_length {
            return Err(SerdeErr);
        }
        let byte = self.buffer[self.bit_index / 8];
        let bit = (byte >> (self.bit_index % 8)) & 1 != 0;
        self.bit_index += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let mut output = 0;
        for i in 0..8 {
            if self.read_bit()? {
                output |= 1 << i;
            }
        }
        Ok(output)
    }

    /// Reads `bit_count` bits into a zero-padded byte vector, the inverse of
    /// `BitWrite::write_bits`.
    pub fn read_bits(&mut self, bit_count: u32) -> Result<Vec<u8>, SerdeErr> {
        let bit_count = bit_count as usize;
        if bit_count > self.bits_remaining() {
            return Err(SerdeErr);
        }
        let mut output = vec![0u8; bit_count.div_ceil(8)];
        for i in 0..bit_count {
            if self.read_bit()? {
                output[i / 8] |= 1 << (i % 8);
            }
        }
        Ok(output)
    }
}
