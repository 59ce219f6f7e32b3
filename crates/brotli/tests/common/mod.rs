//! Assembles bitstreams for tests
//!
//! A copy of the crate-internal `bit_writer` module, which is only compiled for unit tests.

#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_position: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the lowest `n` bits of `value`, least significant bit first
    pub fn bits(&mut self, n: u32, value: u32) -> &mut Self {
        for i in 0..n {
            if self.bit_position % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 == 1 {
                *self.bytes.last_mut().unwrap() |= 1 << (self.bit_position % 8);
            }
            self.bit_position += 1;
        }
        self
    }

    /// Write a prefix code of `length` bits, most significant bit first
    pub fn code(&mut self, length: u32, code: u32) -> &mut Self {
        for i in (0..length).rev() {
            self.bits(1, code >> i);
        }
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}
