//! Context modeling, see <https://www.rfc-editor.org/rfc/rfc7932#section-7>

use crate::{
    bit_reader::BitReader,
    error::{Error, Step},
    prefix_code::read_prefix_code,
};

/// Number of literal contexts per literal block type
pub const LITERAL_CONTEXTS: usize = 64;

/// Number of distance contexts per distance block type
pub const DISTANCE_CONTEXTS: usize = 4;

#[rustfmt::skip]
static LUT0: [u8; 256] = [
     0,  0,  0,  0,  0,  0,  0,  0,  0,  4,  4,  0,  0,  4,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,
     8, 12, 16, 12, 12, 20, 12, 16, 24, 28, 12, 12, 32, 12, 36, 12,
    44, 44, 44, 44, 44, 44, 44, 44, 44, 44, 32, 32, 24, 40, 28, 12,
    12, 48, 52, 52, 52, 48, 52, 52, 52, 48, 52, 52, 52, 52, 52, 48,
    52, 52, 52, 52, 52, 48, 52, 52, 52, 52, 52, 24, 12, 28, 12, 12,
    12, 56, 60, 60, 60, 56, 60, 60, 60, 56, 60, 60, 60, 60, 60, 56,
    60, 60, 60, 60, 60, 56, 60, 60, 60, 60, 60, 24, 12, 28, 12,  0,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
];

#[rustfmt::skip]
static LUT1: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1,
    1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1,
    1, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 1, 1, 1, 1, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2
];

#[rustfmt::skip]
static LUT2: [u8; 256] = [
    0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 7
];

/// Determines how the previous two bytes select the context of a literal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContextMode {
    #[default]
    Lsb6,
    Msb6,
    Utf8,
    Signed,
}

impl ContextMode {
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Self::Lsb6,
            1 => Self::Msb6,
            2 => Self::Utf8,
            _ => Self::Signed,
        }
    }

    /// Compute the literal context id from the last (`p1`) and second-to-last (`p2`) output byte
    #[must_use]
    pub fn literal_context(self, p1: u8, p2: u8) -> usize {
        let context = match self {
            Self::Lsb6 => p1 & 0x3f,
            Self::Msb6 => p1 >> 2,
            Self::Utf8 => LUT0[usize::from(p1)] | LUT1[usize::from(p2)],
            Self::Signed => (LUT2[usize::from(p1)] << 3) | LUT2[usize::from(p2)],
        };
        usize::from(context)
    }
}

/// The distance context only depends on the copy length
#[must_use]
pub fn distance_context(copy_length: usize) -> usize {
    match copy_length {
        0..=2 => 0,
        3 => 1,
        4 => 2,
        _ => 3,
    }
}

/// Maps (block type, context id) pairs to the index of a prefix code
#[derive(Clone, Debug, Default)]
pub struct ContextMap {
    num_trees: usize,
    map: Vec<u8>,
}

impl ContextMap {
    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    /// The prefix code to use for the given context of a block type
    #[must_use]
    pub fn tree(&self, block_type: usize, contexts_per_type: usize, context: usize) -> usize {
        usize::from(self.map[block_type * contexts_per_type + context])
    }
}

pub fn read_context_map(reader: &mut BitReader, size: usize) -> Step<ContextMap> {
    let num_trees = reader.read_count()?;

    if num_trees == 1 {
        return Ok(ContextMap {
            num_trees,
            map: vec![0; size],
        });
    }

    let rle_max = if reader.read_bit()? {
        reader.read_bits(4)? as usize + 1
    } else {
        0
    };

    let prefix_code = read_prefix_code(reader, num_trees + rle_max)?;

    // The alphabet looks like this:
    //
    // 0: value zero
    // 1: repeat a zero 2 to 3 times, read 1 bit for repeat length
    // 2: repeat a zero 4 to 7 times, read 2 bits for repeat length
    // ...
    // RLEMAX: repeat a zero (1 << RLEMAX) to (1 << (RLEMAX+1))-1
    //      times, read RLEMAX bits for repeat length
    // RLEMAX + 1: value 1
    // ...
    // RLEMAX + NTREES - 1: value NTREES - 1
    let mut map = Vec::with_capacity(size);
    while map.len() < size {
        let symbol = usize::from(prefix_code.read_symbol(reader)?);

        if symbol == 0 {
            map.push(0);
        } else if symbol <= rle_max {
            let extra_bits = reader.read_bits(symbol as u32)? as usize;
            let run_length = (1 << symbol) + extra_bits;

            if size < map.len() + run_length {
                log::warn!("Run of {run_length} zeros exceeds the context map size of {size}");
                return Err(Error::InvalidContextMap.into());
            }

            map.resize(map.len() + run_length, 0);
        } else {
            map.push((symbol - rle_max) as u8);
        }
    }

    if reader.read_bit()? {
        inverse_move_to_front(&mut map);
    }

    Ok(ContextMap { num_trees, map })
}

fn inverse_move_to_front(values: &mut [u8]) {
    let mut mtf: [u8; 256] = std::array::from_fn(|i| i as u8);

    for value in values.iter_mut() {
        let index = usize::from(*value);
        let symbol = mtf[index];
        *value = symbol;

        mtf.copy_within(..index, 1);
        mtf[0] = symbol;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bit_writer::BitWriter, error::Interrupt};

    #[test]
    fn literal_context_modes() {
        assert_eq!(ContextMode::Lsb6.literal_context(0xFF, 0), 63);
        assert_eq!(ContextMode::Msb6.literal_context(0xFF, 0), 63);
        assert_eq!(ContextMode::Msb6.literal_context(0x04, 0xFF), 1);
        assert_eq!(ContextMode::Utf8.literal_context(b'a', b' '), 56);
        assert_eq!(ContextMode::Utf8.literal_context(0, 0), 0);
        assert_eq!(ContextMode::Signed.literal_context(0, 0xFF), 7);
        assert_eq!(ContextMode::Signed.literal_context(0xFF, 0xFF), 63);
    }

    #[test]
    fn distance_contexts() {
        assert_eq!(distance_context(2), 0);
        assert_eq!(distance_context(3), 1);
        assert_eq!(distance_context(4), 2);
        assert_eq!(distance_context(5), 3);
        assert_eq!(distance_context(1000), 3);
    }

    #[test]
    fn inverse_move_to_front_transform() {
        let mut values = [0, 1, 1, 0, 2, 2];
        inverse_move_to_front(&mut values);
        assert_eq!(values, [0, 1, 0, 0, 2, 1]);
    }

    #[test]
    fn trivial_context_map() -> Result<(), Interrupt> {
        let bytes = BitWriter::new().bits(1, 0).finish();
        let mut reader = BitReader::from_complete_input(&bytes);

        let map = read_context_map(&mut reader, 128)?;
        assert_eq!(map.num_trees(), 1);
        assert_eq!(map.tree(1, LITERAL_CONTEXTS, 63), 0);
        Ok(())
    }

    #[test]
    fn context_map_with_zero_runs() -> Result<(), Interrupt> {
        let bytes = BitWriter::new()
            .bits(1, 1) // NTREES = 2
            .bits(3, 0)
            .bits(1, 1) // RLEMAX = 1
            .bits(4, 0)
            // Simple prefix code with symbols 2, 0 and 1 (2 bits each)
            // => 2: "0", 0: "10", 1: "11"
            .bits(2, 1)
            .bits(2, 2)
            .bits(2, 2)
            .bits(2, 0)
            .bits(2, 1)
            // 1, three zeros, 0, 1
            .code(1, 0b0)
            .code(2, 0b11)
            .bits(1, 1)
            .code(2, 0b10)
            .code(1, 0b0)
            .bits(1, 0) // no inverse move-to-front transform
            .finish();
        let mut reader = BitReader::from_complete_input(&bytes);

        let map = read_context_map(&mut reader, 6)?;
        assert_eq!(map.num_trees(), 2);
        assert_eq!(map.map, [1, 0, 0, 0, 0, 1]);
        Ok(())
    }

    #[test]
    fn zero_run_exceeding_context_map() {
        let bytes = BitWriter::new()
            .bits(1, 1)
            .bits(3, 0)
            .bits(1, 1)
            .bits(4, 0)
            .bits(2, 1)
            .bits(2, 2)
            .bits(2, 2)
            .bits(2, 0)
            .bits(2, 1)
            .code(2, 0b11)
            .bits(1, 1)
            .finish();
        let mut reader = BitReader::from_complete_input(&bytes);

        assert!(matches!(
            read_context_map(&mut reader, 2),
            Err(Interrupt::Failed(Error::InvalidContextMap))
        ));
    }
}
