use crate::BitCounter;

pub trait BitWrite {
    fn write_bit(&mut self, bit: bool);
    fn write_byte(&mut self, byte: u8);
    fn count_bits(&mut self, bits: u32);
    fn is_counter(&self) -> bool;

    /// Writes the first `bit_count` bits of `bytes`, least significant bit of
    /// each byte first.
    fn write_bits(&mut self, bytes: &[u8], bit_count: u32) {
        if self.is_counter() {
            self.count_bits(bit_count);
            return;
        }
        for i in 0..bit_count as usize {
            let byte = bytes.get(i / 8).copied().unwrap_or(0);
            self.write_bit((byte >> (i % 8)) & 1 != 0);
        }
    }
}

/// A growable bit writer with an explicit bit budget.
///
/// Writes past the budget are dropped and latch the `overflowed` flag, so a
/// caller can encode speculatively into a scratch writer and discard it.
pub struct BitWriter {
    scratch: u8,
    scratch_index: u8,
    buffer: Vec<u8>,
    bits_written: u32,
    max_bits: u32,
    overflowed: bool,
}

impl BitWriter {
    /// A writer with no practical size limit.
    pub fn new() -> Self {
        Self::with_max_bits(u32::MAX)
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        let max_bits = u32::try_from(max_bytes.saturating_mul(8)).unwrap_or(u32::MAX);
        Self::with_max_bits(max_bits)
    }

    pub fn with_max_bits(max_bits: u32) -> Self {
        Self {
            scratch: 0,
            scratch_index: 0,
            buffer: Vec::with_capacity(64),
            bits_written: 0,
            max_bits,
            overflowed: false,
        }
    }

    fn flush_scratch(&mut self) {
        if self.scratch_index > 0 {
            let byte = (self.scratch << (8 - self.scratch_index)).reverse_bits();
            self.buffer.push(byte);
            self.scratch = 0;
            self.scratch_index = 0;
        }
    }

    pub fn to_bytes(mut self) -> Vec<u8> {
        self.flush_scratch();
        self.buffer
    }

    /// Copies out the bytes written so far without consuming the writer.
    pub fn bytes(&self) -> Vec<u8> {
        let mut output = self.buffer.clone();
        if self.scratch_index > 0 {
            output.push((self.scratch << (8 - self.scratch_index)).reverse_bits());
        }
        output
    }

    pub fn bits_written(&self) -> u32 {
        self.bits_written
    }

    pub fn bits_free(&self) -> u32 {
        self.max_bits.saturating_sub(self.bits_written)
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Holds back `bits` from the budget, for terminator bits that must fit
    /// no matter what gets written in between.
    pub fn reserve_bits(&mut self, bits: u32) {
        self.max_bits = self.max_bits.saturating_sub(bits);
    }

    pub fn release_bits(&mut self, bits: u32) {
        self.max_bits = self.max_bits.saturating_add(bits);
    }

    /// A counter that starts from this writer's position and budget.
    pub fn counter(&self) -> BitCounter {
        BitCounter::new(self.bits_written, self.bits_written, self.max_bits)
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitWriter {
    fn write_bit(&mut self, bit: bool) {
        if self.bits_written >= self.max_bits {
            self.overflowed = true;
            return;
        }

        self.scratch <<= 1;

        if bit {
            self.scratch |= 1;
        }

        self.scratch_index += 1;
        self.bits_written += 1;

        if self.scratch_index >= 8 {
            self.buffer.push(self.scratch.reverse_bits());
            self.scratch_index = 0;
            self.scratch = 0;
        }
    }

    fn write_byte(&mut self, byte: u8) {
        let mut temp = byte;
        for _ in 0..8 {
            self.write_bit(temp & 1 != 0);
            temp >>= 1;
        }
    }

    fn count_bits(&mut self, _bits: u32) {
        panic!("This method should not be called for BitWriter!");
    }

    fn is_counter(&self) -> bool {
        false
    }
}
