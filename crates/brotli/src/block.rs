//! Block types and block switching, see <https://www.rfc-editor.org/rfc/rfc7932#section-6>

use crate::{
    bit_reader::BitReader,
    error::Step,
    huffman::HuffmanTable,
    prefix_code::read_prefix_code,
};

pub const NUM_BLOCK_LENGTH_CODES: usize = 26;

/// Block length for categories with a single block type, they never switch
const SINGLE_BLOCK_LENGTH: usize = 1 << 24;

/// The three symbol categories that are each split into blocks of their own
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Literal,
    Command,
    Distance,
}

impl Category {
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Literal => Some(Self::Command),
            Self::Command => Some(Self::Distance),
            Self::Distance => None,
        }
    }
}

/// Tracks the current block of one [Category]
#[derive(Clone, Debug)]
pub struct BlockSwitcher {
    num_types: usize,
    block_type: usize,
    previous_type: usize,
    remaining: usize,
    type_code: Option<HuffmanTable>,
    length_code: Option<HuffmanTable>,
}

impl Default for BlockSwitcher {
    fn default() -> Self {
        Self {
            num_types: 1,
            block_type: 0,
            previous_type: 1,
            remaining: SINGLE_BLOCK_LENGTH,
            type_code: None,
            length_code: None,
        }
    }
}

impl BlockSwitcher {
    /// Read the number of block types and, if there is more than one,
    /// the prefix code for block types
    pub fn read_types(reader: &mut BitReader) -> Step<Self> {
        let num_types = reader.read_count()?;

        let type_code = if 2 <= num_types {
            Some(read_prefix_code(reader, num_types + 2)?)
        } else {
            None
        };

        Ok(Self {
            num_types,
            type_code,
            ..Self::default()
        })
    }

    /// Read the prefix code for block lengths and the length of the first block.
    ///
    /// Nothing is read if there is only a single block type.
    pub fn read_first_length(&mut self, reader: &mut BitReader) -> Step {
        if self.num_types < 2 {
            return Ok(());
        }

        let length_code = read_prefix_code(reader, NUM_BLOCK_LENGTH_CODES)?;
        let length = read_block_length(reader, &length_code)?;

        self.length_code = Some(length_code);
        self.remaining = length;
        Ok(())
    }

    #[must_use]
    pub fn num_types(&self) -> usize {
        self.num_types
    }

    #[must_use]
    pub fn block_type(&self) -> usize {
        self.block_type
    }

    /// Whether the current block is used up and a block switch command must be read
    #[must_use]
    pub fn needs_switch(&self) -> bool {
        self.remaining == 0
    }

    /// Account for one symbol of the current block
    pub fn consume(&mut self) {
        debug_assert!(!self.needs_switch());
        self.remaining -= 1;
    }

    /// Read a block switch command.
    ///
    /// The state is only modified once the whole command was read.
    pub fn switch(&mut self, reader: &mut BitReader) -> Step {
        let (Some(type_code), Some(length_code)) = (&self.type_code, &self.length_code) else {
            self.remaining = SINGLE_BLOCK_LENGTH;
            return Ok(());
        };

        let code = usize::from(type_code.read_symbol(reader)?);
        let length = read_block_length(reader, length_code)?;

        let block_type = match code {
            0 => self.previous_type,
            1 => (self.block_type + 1) % self.num_types,
            _ => code - 2,
        };

        log::trace!("Switching to block type {block_type} for {length} symbols");

        self.previous_type = self.block_type;
        self.block_type = block_type;
        self.remaining = length;
        Ok(())
    }
}

fn read_block_length(reader: &mut BitReader, length_code: &HuffmanTable) -> Step<usize> {
    let code = usize::from(length_code.read_symbol(reader)?);
    let (base, num_extra_bits) = block_length_code(code);
    let extra_bits = reader.read_bits(num_extra_bits)? as usize;

    Ok(base + extra_bits)
}

/// Returns a tuple of `(base, num_extra_bits)` for a block length code
///
/// The final length is given by `base + read(num_extra_bits)`
fn block_length_code(code: usize) -> (usize, u32) {
    match code {
        0 => (1, 2),
        1 => (5, 2),
        2 => (9, 2),
        3 => (13, 2),
        4 => (17, 3),
        5 => (25, 3),
        6 => (33, 3),
        7 => (41, 3),
        8 => (49, 4),
        9 => (65, 4),
        10 => (81, 4),
        11 => (97, 4),
        12 => (113, 5),
        13 => (145, 5),
        14 => (177, 5),
        15 => (209, 5),
        16 => (241, 6),
        17 => (305, 6),
        18 => (369, 7),
        19 => (497, 8),
        20 => (753, 9),
        21 => (1265, 10),
        22 => (2289, 11),
        23 => (4337, 12),
        24 => (8433, 13),
        _ => (16625, 24),
    }
}
