//! Bit-level access to the compressed input.
//!
//! Brotli packs values starting at the least significant bit of each byte.
//! The reader owns all input that has been pushed but not yet consumed, so
//! decoding can be suspended at any bit position and resumed once more input arrives.

use crate::error::{Error, Interrupt, Step};

/// Consumed input is only discarded once it makes up at least this many bytes
const MIN_COMPACTION_SIZE: usize = 4096;

#[derive(Debug, Default)]
pub struct BitReader {
    input: Vec<u8>,
    next_byte: usize,

    /// Bits that were loaded from `input` but not consumed yet.
    ///
    /// Everything above `bits_in_window` is always zero.
    window: u64,
    bits_in_window: u32,
    end_of_input: bool,
}

/// A position in the input that a [BitReader] can be rewound to
#[derive(Clone, Copy, Debug)]
pub struct Checkpoint {
    next_byte: usize,
    window: u64,
    bits_in_window: u32,
}

impl BitReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader over a complete stream
    #[must_use]
    pub fn from_complete_input(input: &[u8]) -> Self {
        Self {
            input: input.to_vec(),
            end_of_input: true,
            ..Self::default()
        }
    }

    /// Append input to the stream.
    ///
    /// This invalidates previously taken [Checkpoints](Checkpoint).
    pub fn push_input(&mut self, bytes: &[u8]) {
        if MIN_COMPACTION_SIZE <= self.next_byte && self.input.len() <= 2 * self.next_byte {
            self.input.drain(..self.next_byte);
            self.next_byte = 0;
        }
        self.input.extend_from_slice(bytes);
    }

    /// Mark the end of the stream, running out of bits becomes fatal after this
    pub fn set_end_of_input(&mut self) {
        self.end_of_input = true;
    }

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            next_byte: self.next_byte,
            window: self.window,
            bits_in_window: self.bits_in_window,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.next_byte = checkpoint.next_byte;
        self.window = checkpoint.window;
        self.bits_in_window = checkpoint.bits_in_window;
    }

    /// The interrupt to report when a read could not be satisfied
    #[must_use]
    pub fn exhausted(&self) -> Interrupt {
        if self.end_of_input {
            log::warn!("Compressed stream ended unexpectedly");
            Interrupt::Failed(Error::TruncatedInput)
        } else {
            Interrupt::NeedsMoreInput
        }
    }

    fn fill_window(&mut self) {
        while self.bits_in_window <= 56 {
            let Some(&byte) = self.input.get(self.next_byte) else {
                break;
            };
            self.window |= u64::from(byte) << self.bits_in_window;
            self.bits_in_window += 8;
            self.next_byte += 1;
        }
    }

    /// Look at the next `n` bits without consuming them.
    ///
    /// Bits past the end of the available input read as zero.
    #[must_use]
    pub fn peek_bits(&mut self, n: u32) -> u32 {
        debug_assert!(n <= 32);

        if self.bits_in_window < n {
            self.fill_window();
        }
        (self.window & low_bits(n)) as u32
    }

    pub fn skip_bits(&mut self, n: u32) -> Step {
        if self.bits_in_window < n {
            self.fill_window();

            if self.bits_in_window < n {
                return Err(self.exhausted());
            }
        }

        self.window >>= n;
        self.bits_in_window -= n;
        Ok(())
    }

    pub fn read_bits(&mut self, n: u32) -> Step<u32> {
        let value = self.peek_bits(n);
        self.skip_bits(n)?;
        Ok(value)
    }

    pub fn read_bit(&mut self) -> Step<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Read a number between 1 and 256 (inclusive), using between 1 and 11 bits.
    ///
    /// This encoding is used for the number of block types and the number of
    /// prefix codes in a context map.
    pub fn read_count(&mut self) -> Step<usize> {
        if !self.read_bit()? {
            return Ok(1);
        }

        let n = self.read_bits(3)?;
        if n == 0 {
            return Ok(2);
        }

        let extra = self.read_bits(n)?;
        Ok((1 << n) + 1 + extra as usize)
    }

    /// Skip to the next byte boundary, returning the bits that were skipped
    pub fn align_to_byte(&mut self) -> Step<u32> {
        self.read_bits(self.bits_in_window % 8)
    }

    /// Copy whole bytes into `destination`, returning how many bytes were copied.
    ///
    /// The reader must be aligned to a byte boundary.
    pub fn read_aligned_bytes(&mut self, destination: &mut [u8]) -> usize {
        debug_assert_eq!(self.bits_in_window % 8, 0);

        let mut copied = 0;
        while copied < destination.len() && self.bits_in_window != 0 {
            destination[copied] = self.window as u8;
            self.window >>= 8;
            self.bits_in_window -= 8;
            copied += 1;
        }

        let remaining = &self.input[self.next_byte..];
        let n = remaining.len().min(destination.len() - copied);
        destination[copied..copied + n].copy_from_slice(&remaining[..n]);
        self.next_byte += n;

        copied + n
    }

    /// Skip up to `n` whole bytes, returning how many were skipped.
    ///
    /// The reader must be aligned to a byte boundary.
    pub fn skip_aligned_bytes(&mut self, n: usize) -> usize {
        debug_assert_eq!(self.bits_in_window % 8, 0);

        let mut skipped = 0;
        while skipped < n && self.bits_in_window != 0 {
            self.window >>= 8;
            self.bits_in_window -= 8;
            skipped += 1;
        }

        let from_input = (self.input.len() - self.next_byte).min(n - skipped);
        self.next_byte += from_input;

        skipped + from_input
    }
}

#[inline]
fn low_bits(n: u32) -> u64 {
    (1 << n) - 1
}
