//! Canonical prefix codes, decoded through two-level lookup tables.
//!
//! The root table is indexed by the next [ROOT_BITS] bits of input. Codes that are
//! longer than that continue in a second-level table that is referenced from the root.

use crate::{
    bit_reader::BitReader,
    error::{Error, Step},
};

pub const MAX_CODE_LENGTH: usize = 15;

/// Number of bits that index the root table of the codes for literals, commands and distances
pub const ROOT_BITS: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Entry {
    /// A symbol whose code has `length` bits (counted from the start of the current table)
    Symbol { length: u8, value: u16 },

    /// The code continues in the second-level table at `offset`,
    /// which is indexed by the next `bits` bits
    SubTable { bits: u8, offset: u32 },
}

impl Default for Entry {
    fn default() -> Self {
        Self::Symbol {
            length: 0,
            value: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HuffmanTable {
    entries: Vec<Entry>,
    root_bits: u32,
}

impl HuffmanTable {
    /// A code with only one symbol, which takes up zero bits
    #[must_use]
    pub fn single(symbol: u16) -> Self {
        Self {
            entries: vec![Entry::Symbol {
                length: 0,
                value: symbol,
            }],
            root_bits: 0,
        }
    }

    /// Build a table from the code length of each symbol, where zero means the symbol is unused.
    ///
    /// The code lengths need to describe a complete prefix code.
    pub fn from_lengths(code_lengths: &[u8], root_bits: u32) -> Result<Self, Error> {
        let mut count = [0u16; MAX_CODE_LENGTH + 1];
        for &length in code_lengths {
            if usize::from(length) > MAX_CODE_LENGTH {
                log::warn!("Prefix code length {length} is too long");
                return Err(Error::MalformedHuffmanCode);
            }
            count[usize::from(length)] += 1;
        }
        count[0] = 0;

        // Every code of length n takes up 2^(15 - n) of the 2^15 available code words
        let mut space: i32 = 1 << MAX_CODE_LENGTH;
        for (length, &n) in count.iter().enumerate().skip(1) {
            space -= i32::from(n) << (MAX_CODE_LENGTH - length);
        }
        if space != 0 {
            log::warn!("Prefix code is not complete ({space} code words are left over)");
            return Err(Error::MalformedHuffmanCode);
        }

        let mut symbols: Vec<(u8, u16)> = code_lengths
            .iter()
            .enumerate()
            .filter(|(_, &length)| length != 0)
            .map(|(symbol, &length)| (length, symbol as u16))
            .collect();
        symbols.sort_unstable();

        let root_size = 1 << root_bits;
        let mut entries = vec![Entry::default(); root_size];
        let mut remaining = count;

        let mut code: u32 = 0;
        let mut previous_length = 0;
        let mut current_sub_table: Option<(usize, usize, u32)> = None;

        for (length, value) in symbols {
            code <<= length - previous_length;
            previous_length = length;

            // Codes are packed starting with their most significant bit
            let reversed = reverse_bits(code, length.into()) as usize;

            if u32::from(length) <= root_bits {
                for index in (reversed..root_size).step_by(1 << length) {
                    entries[index] = Entry::Symbol { length, value };
                }
            } else {
                let root_index = reversed & (root_size - 1);

                let (offset, bits) = match current_sub_table {
                    Some((index, offset, bits)) if index == root_index => (offset, bits),
                    _ => {
                        let bits = sub_table_bits(&remaining, length.into(), root_bits);
                        let offset = entries.len();
                        entries.resize(offset + (1 << bits), Entry::default());
                        entries[root_index] = Entry::SubTable {
                            bits: bits as u8,
                            offset: offset as u32,
                        };
                        current_sub_table = Some((root_index, offset, bits));
                        (offset, bits)
                    },
                };

                let sub_length = length - root_bits as u8;
                for index in ((reversed >> root_bits)..1 << bits).step_by(1 << sub_length) {
                    entries[offset + index] = Entry::Symbol {
                        length: sub_length,
                        value,
                    };
                }
            }

            remaining[usize::from(length)] -= 1;
            code += 1;
        }

        Ok(Self { entries, root_bits })
    }

    /// Find the symbol at the start of `bits`, returning it together with the length of its code
    #[must_use]
    fn lookup(&self, bits: u32) -> Option<(u16, u32)> {
        let root_mask = (1 << self.root_bits) - 1;

        match self.entries[bits as usize & root_mask] {
            Entry::Symbol { length, value } => Some((value, length.into())),
            Entry::SubTable {
                bits: table_bits,
                offset,
            } => {
                let index = (bits >> self.root_bits) as usize & ((1 << table_bits) - 1);
                match self.entries[offset as usize + index] {
                    Entry::Symbol { length, value } => {
                        Some((value, self.root_bits + u32::from(length)))
                    },
                    Entry::SubTable { .. } => None,
                }
            },
        }
    }

    pub fn read_symbol(&self, reader: &mut BitReader) -> Step<u16> {
        let bits = reader.peek_bits(MAX_CODE_LENGTH as u32);
        let Some((symbol, length)) = self.lookup(bits) else {
            return Err(Error::MalformedHuffmanCode.into());
        };
        reader.skip_bits(length)?;
        Ok(symbol)
    }
}

/// Determine how many bits the second-level table for a code of length `length` needs
/// so that it can hold all codes that share the same root prefix
fn sub_table_bits(
    remaining: &[u16; MAX_CODE_LENGTH + 1],
    mut length: usize,
    root_bits: u32,
) -> u32 {
    let root_bits = root_bits as usize;
    let mut left: i32 = 1 << (length - root_bits);

    while length < MAX_CODE_LENGTH {
        left -= i32::from(remaining[length]);
        if left <= 0 {
            break;
        }
        length += 1;
        left <<= 1;
    }

    (length - root_bits) as u32
}

#[inline]
fn reverse_bits(value: u32, length: u32) -> u32 {
    value.reverse_bits() >> (u32::BITS - length)
}

/// The prefix codes of one category within a meta-block
#[derive(Clone, Debug, Default)]
pub struct HuffmanTreeGroup {
    alphabet_size: usize,
    num_tables: usize,
    tables: Vec<HuffmanTable>,
}

impl HuffmanTreeGroup {
    #[must_use]
    pub fn new(alphabet_size: usize, num_tables: usize) -> Self {
        Self {
            alphabet_size,
            num_tables,
            tables: Vec::with_capacity(num_tables),
        }
    }

    #[must_use]
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.tables.len() == self.num_tables
    }

    pub fn push(&mut self, table: HuffmanTable) {
        debug_assert!(!self.is_complete());
        self.tables.push(table);
    }

    #[must_use]
    pub fn get(&self, index: usize) -> &HuffmanTable {
        &self.tables[index]
    }
}
