//! Insert-and-copy commands, see <https://www.rfc-editor.org/rfc/rfc7932#section-5>

use crate::{bit_reader::BitReader, error::Step, huffman::HuffmanTable};

pub const NUM_COMMAND_SYMBOLS: usize = 704;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Command {
    /// Number of literals that precede the copy
    pub insert_length: usize,
    pub copy_length: usize,

    /// The copy reuses the last distance instead of reading a distance code
    pub uses_last_distance: bool,
}

pub fn read_command(reader: &mut BitReader, command_code: &HuffmanTable) -> Step<Command> {
    let symbol = command_code.read_symbol(reader)?;
    let (insert_code, copy_code) = split_command_symbol(symbol);

    let (base, num_extra_bits) = insert_length_code(insert_code);
    let insert_length = base + reader.read_bits(num_extra_bits)? as usize;

    let (base, num_extra_bits) = copy_length_code(copy_code);
    let copy_length = base + reader.read_bits(num_extra_bits)? as usize;

    Ok(Command {
        insert_length,
        copy_length,
        uses_last_distance: symbol < 128,
    })
}

/// Split a command symbol into its insert length code and copy length code
fn split_command_symbol(symbol: u16) -> (usize, usize) {
    let symbol = usize::from(symbol);

    let (insert_base, copy_base) = match symbol {
        0..=63 => (0, 0),
        64..=127 => (0, 8),
        128..=191 => (0, 0),
        192..=255 => (0, 8),
        256..=319 => (8, 0),
        320..=383 => (8, 8),
        384..=447 => (0, 16),
        448..=511 => (16, 0),
        512..=575 => (8, 16),
        576..=639 => (16, 8),
        _ => (16, 16),
    };

    let insert_length_extra = (symbol >> 3) & 0b111;
    let copy_length_extra = symbol & 0b111;

    (
        insert_base + insert_length_extra,
        copy_base + copy_length_extra,
    )
}

/// Returns a tuple of `(base, num_extra_bits)` for an insert length code
fn insert_length_code(code: usize) -> (usize, u32) {
    match code {
        0 => (0, 0),
        1 => (1, 0),
        2 => (2, 0),
        3 => (3, 0),
        4 => (4, 0),
        5 => (5, 0),
        6 => (6, 1),
        7 => (8, 1),
        8 => (10, 2),
        9 => (14, 2),
        10 => (18, 3),
        11 => (26, 3),
        12 => (34, 4),
        13 => (50, 4),
        14 => (66, 5),
        15 => (98, 5),
        16 => (130, 6),
        17 => (194, 7),
        18 => (322, 8),
        19 => (578, 9),
        20 => (1090, 10),
        21 => (2114, 12),
        22 => (6210, 14),
        _ => (22594, 24),
    }
}

/// Returns a tuple of `(base, num_extra_bits)` for a copy length code
fn copy_length_code(code: usize) -> (usize, u32) {
    match code {
        0 => (2, 0),
        1 => (3, 0),
        2 => (4, 0),
        3 => (5, 0),
        4 => (6, 0),
        5 => (7, 0),
        6 => (8, 0),
        7 => (9, 0),
        8 => (10, 1),
        9 => (12, 1),
        10 => (14, 2),
        11 => (18, 2),
        12 => (22, 3),
        13 => (30, 3),
        14 => (38, 4),
        15 => (54, 4),
        16 => (70, 5),
        17 => (102, 5),
        18 => (134, 6),
        19 => (198, 7),
        20 => (326, 8),
        21 => (582, 9),
        22 => (1094, 10),
        _ => (2118, 24),
    }
}
