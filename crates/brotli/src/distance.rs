//! Distance codes and the ring of recent distances, see RFC 7932, section 4

use crate::{
    bit_reader::BitReader,
    error::{Error, Step},
};

pub const NUM_DISTANCE_SHORT_CODES: usize = 16;

/// Which of the last four distances a short code refers to, counting backwards
const SHORT_CODE_INDEX: [usize; NUM_DISTANCE_SHORT_CODES] =
    [0, 1, 2, 3, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];

/// The offset that a short code applies to the distance it refers to
const SHORT_CODE_OFFSET: [isize; NUM_DISTANCE_SHORT_CODES] =
    [0, 0, 0, 0, -1, 1, -2, 2, -3, 3, -1, 1, -2, 2, -3, 3];

/// The four most recent distances
#[derive(Clone, Copy, Debug)]
pub struct DistanceRing {
    distances: [usize; 4],

    /// Index of the oldest distance, which is overwritten next
    next: usize,
}

impl Default for DistanceRing {
    fn default() -> Self {
        // The last distance is 4, the one before is 11 and so on
        Self {
            distances: [16, 15, 11, 4],
            next: 0,
        }
    }
}

impl DistanceRing {
    /// Look up a distance, `0` being the most recent one
    #[must_use]
    pub fn nth_last(&self, n: usize) -> usize {
        debug_assert!(n < 4);
        self.distances[(self.next + 3 - n) % 4]
    }

    #[must_use]
    pub fn last(&self) -> usize {
        self.nth_last(0)
    }

    pub fn push(&mut self, distance: usize) {
        self.distances[self.next] = distance;
        self.next = (self.next + 1) % 4;
    }
}

/// The parameters from the meta-block header that shape the distance alphabet
#[derive(Clone, Copy, Debug, Default)]
pub struct DistanceParameters {
    pub postfix_bits: u32,
    pub num_direct: usize,
}

impl DistanceParameters {
    pub fn read(reader: &mut BitReader) -> Step<Self> {
        let postfix_bits = reader.read_bits(2)?;
        let num_direct = (reader.read_bits(4)? as usize) << postfix_bits;

        Ok(Self {
            postfix_bits,
            num_direct,
        })
    }

    #[must_use]
    pub fn alphabet_size(&self) -> usize {
        NUM_DISTANCE_SHORT_CODES + self.num_direct + (48 << self.postfix_bits)
    }
}

/// Resolve a short distance code against the ring of recent distances
pub fn resolve_short_code(code: usize, ring: &DistanceRing) -> Result<usize, Error> {
    let base = ring.nth_last(SHORT_CODE_INDEX[code]) as isize;
    let distance = base + SHORT_CODE_OFFSET[code];

    if distance <= 0 {
        log::warn!("Distance code {code} resolves to non-positive distance {distance}");
        return Err(Error::InvalidBackwardReference);
    }

    Ok(distance as usize)
}

/// Turn a distance symbol into a distance, reading extra bits if the code requires them
pub fn read_distance(
    reader: &mut BitReader,
    code: usize,
    parameters: &DistanceParameters,
    ring: &DistanceRing,
) -> Step<usize> {
    if code < NUM_DISTANCE_SHORT_CODES {
        return Ok(resolve_short_code(code, ring)?);
    }

    if code < NUM_DISTANCE_SHORT_CODES + parameters.num_direct {
        return Ok(code - (NUM_DISTANCE_SHORT_CODES - 1));
    }

    let postfix_mask = (1 << parameters.postfix_bits) - 1;
    let code = code - parameters.num_direct - NUM_DISTANCE_SHORT_CODES;

    let num_extra_bits = 1 + (code >> (parameters.postfix_bits + 1)) as u32;
    let extra_bits = reader.read_bits(num_extra_bits)? as usize;

    let hcode = code >> parameters.postfix_bits;
    let lcode = code & postfix_mask;
    let offset = ((2 + (hcode & 1)) << num_extra_bits) - 4;

    Ok(((offset + extra_bits) << parameters.postfix_bits) + lcode + parameters.num_direct + 1)
}
