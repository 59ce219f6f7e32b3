//! The sliding window of decompressed output.
//!
//! Backward references can reach up to one window size into the past, so the window
//! keeps the most recent output around even after it was handed to the caller.
//! Bytes that were not flushed yet are never overwritten.

#[derive(Debug, Default)]
pub struct RingBuffer {
    buffer: Vec<u8>,

    /// Total number of bytes that were ever written
    position: usize,

    /// Total number of bytes that were handed out through [RingBuffer::flush_into]
    flushed: usize,
}

impl RingBuffer {
    #[must_use]
    pub fn new(window_bits: u32) -> Self {
        Self {
            buffer: vec![0; 1 << window_bits],
            position: 0,
            flushed: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.capacity() - 1
    }

    /// Total number of bytes that were decompressed so far
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes that were written but not flushed yet
    #[must_use]
    pub fn unflushed(&self) -> usize {
        self.position - self.flushed
    }

    /// Number of bytes that can be written before the window needs to be flushed
    #[must_use]
    pub fn free_space(&self) -> usize {
        self.capacity() - self.unflushed()
    }

    /// Get the byte that was written `n + 1` bytes ago, or zero if there is no such byte
    #[must_use]
    pub fn last_byte(&self, n: usize) -> u8 {
        if self.position <= n {
            return 0;
        }
        self.buffer[(self.position - n - 1) & self.mask()]
    }

    pub fn push(&mut self, byte: u8) {
        debug_assert_ne!(self.free_space(), 0);

        let index = self.position & self.mask();
        self.buffer[index] = byte;
        self.position += 1;
    }

    /// Write as much of `bytes` as fits, returning the number of bytes that were written
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let mut written = 0;
        let length = bytes.len().min(self.free_space());

        while written < length {
            let chunk = self.spare_space(length - written);
            let n = chunk.len();
            chunk.copy_from_slice(&bytes[written..written + n]);
            self.commit(n);
            written += n;
        }

        written
    }

    /// The contiguous free space following the write position, at most `limit` bytes long.
    ///
    /// The bytes only become part of the output once they are [committed](RingBuffer::commit).
    pub fn spare_space(&mut self, limit: usize) -> &mut [u8] {
        let start = self.position & self.mask();
        let length = limit
            .min(self.free_space())
            .min(self.capacity() - start);

        &mut self.buffer[start..start + length]
    }

    pub fn commit(&mut self, n: usize) {
        debug_assert!(n <= self.free_space());
        self.position += n;
    }

    /// Repeat `length` bytes starting `distance` bytes in the past, returning how many were copied.
    ///
    /// Copies may overlap with themselves, in which case the repeated
    /// bytes are part of the copy.
    pub fn copy_backward(&mut self, distance: usize, length: usize) -> usize {
        debug_assert!(0 < distance && distance <= self.position);
        debug_assert!(distance <= self.capacity());

        let mask = self.mask();
        let length = length.min(self.free_space());
        let mut copied = 0;

        while copied < length {
            let destination = self.position & mask;
            let source = (self.position - distance) & mask;

            // Never read bytes that are written by the same chunk
            let chunk = (length - copied)
                .min(distance)
                .min(self.capacity() - destination)
                .min(self.capacity() - source);

            self.buffer.copy_within(source..source + chunk, destination);
            self.position += chunk;
            copied += chunk;
        }

        copied
    }

    /// Hand out unflushed bytes, returning how many were written to `output`
    pub fn flush_into(&mut self, output: &mut [u8]) -> usize {
        let mut written = 0;

        while written < output.len() && self.flushed < self.position {
            let start = self.flushed & self.mask();
            let chunk = self
                .unflushed()
                .min(self.capacity() - start)
                .min(output.len() - written);

            output[written..written + chunk].copy_from_slice(&self.buffer[start..start + chunk]);
            written += chunk;
            self.flushed += chunk;
        }

        written
    }
}
