//! Reading prefix code descriptions, see RFC 7932, sections 3.4 and 3.5

use crate::{
    bit_reader::BitReader,
    error::{Error, Step},
    huffman::{HuffmanTable, MAX_CODE_LENGTH, ROOT_BITS},
};

const NUM_CODE_LENGTH_CODES: usize = 18;

/// The order in which the code lengths of the code length alphabet are transmitted
const CODE_LENGTH_ORDER: [usize; NUM_CODE_LENGTH_CODES] =
    [1, 2, 3, 4, 0, 5, 17, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15];

// The code lengths of the code length alphabet are themselves encoded with a fixed code:
//
//   value | code
//   ------+------
//     0   | 00
//     1   | 0111
//     2   | 011
//     3   | 10
//     4   | 01
//     5   | 1111
//
// These two tables are indexed by the next four bits of input.
const CODE_LENGTH_PREFIX_LENGTH: [u8; 16] = [2, 2, 2, 3, 2, 2, 2, 4, 2, 2, 2, 3, 2, 2, 2, 4];
const CODE_LENGTH_PREFIX_VALUE: [u8; 16] = [0, 4, 3, 2, 0, 4, 3, 1, 0, 4, 3, 2, 0, 4, 3, 5];

/// Code lengths of the code length alphabet are at most 5 bits long
const CODE_LENGTH_ROOT_BITS: u32 = 5;

const REPEAT_PREVIOUS_CODE_LENGTH: u16 = 16;
const REPEAT_ZERO_CODE_LENGTH: u16 = 17;
const DEFAULT_CODE_LENGTH: u8 = 8;

/// Read the description of a prefix code over an alphabet with `alphabet_size` symbols
pub fn read_prefix_code(reader: &mut BitReader, alphabet_size: usize) -> Step<HuffmanTable> {
    match reader.read_bits(2)? {
        1 => read_simple_prefix_code(reader, alphabet_size),
        skip => read_complex_prefix_code(reader, alphabet_size, skip as usize),
    }
}

/// Number of bits needed to store any symbol of the alphabet
fn alphabet_bits(alphabet_size: usize) -> u32 {
    usize::BITS - (alphabet_size - 1).leading_zeros()
}

fn read_simple_prefix_code(reader: &mut BitReader, alphabet_size: usize) -> Step<HuffmanTable> {
    let num_symbols = reader.read_bits(2)? as usize + 1;
    let symbol_bits = alphabet_bits(alphabet_size);

    let mut symbols = [0; 4];
    for i in 0..num_symbols {
        let symbol = reader.read_bits(symbol_bits)? as u16;

        if alphabet_size <= usize::from(symbol) {
            log::warn!("Symbol {symbol} is outside of the alphabet (size {alphabet_size})");
            return Err(Error::MalformedHuffmanCode.into());
        }

        if symbols[..i].contains(&symbol) {
            log::warn!("Simple prefix code contains symbol {symbol} more than once");
            return Err(Error::MalformedHuffmanCode.into());
        }

        symbols[i] = symbol;
    }

    let lengths: &[u8] = match num_symbols {
        1 => return Ok(HuffmanTable::single(symbols[0])),
        2 => &[1, 1],
        3 => &[1, 2, 2],
        _ => {
            if reader.read_bit()? {
                &[1, 2, 3, 3]
            } else {
                &[2, 2, 2, 2]
            }
        },
    };

    let mut code_lengths = vec![0; alphabet_size];
    for (&symbol, &length) in symbols.iter().zip(lengths) {
        code_lengths[usize::from(symbol)] = length;
    }

    Ok(HuffmanTable::from_lengths(&code_lengths, ROOT_BITS)?)
}

fn read_complex_prefix_code(
    reader: &mut BitReader,
    alphabet_size: usize,
    skip: usize,
) -> Step<HuffmanTable> {
    let mut code_length_code_lengths = [0; NUM_CODE_LENGTH_CODES];
    let mut space: i32 = 32;
    let mut num_codes = 0;

    for &symbol in &CODE_LENGTH_ORDER[skip..] {
        let index = reader.peek_bits(4) as usize;
        reader.skip_bits(CODE_LENGTH_PREFIX_LENGTH[index].into())?;

        let length = CODE_LENGTH_PREFIX_VALUE[index];
        code_length_code_lengths[symbol] = length;

        if length != 0 {
            space -= 32 >> length;
            num_codes += 1;

            if space <= 0 {
                break;
            }
        }
    }

    if num_codes != 1 && space != 0 {
        log::warn!("Code length code is not complete");
        return Err(Error::MalformedHuffmanCode.into());
    }

    let code_length_code = match code_length_code_lengths
        .iter()
        .position(|&length| length != 0)
    {
        Some(symbol) if num_codes == 1 => HuffmanTable::single(symbol as u16),
        _ => HuffmanTable::from_lengths(&code_length_code_lengths, CODE_LENGTH_ROOT_BITS)?,
    };

    let code_lengths = read_symbol_code_lengths(reader, &code_length_code, alphabet_size)?;
    Ok(HuffmanTable::from_lengths(&code_lengths, ROOT_BITS)?)
}

fn read_symbol_code_lengths(
    reader: &mut BitReader,
    code_length_code: &HuffmanTable,
    alphabet_size: usize,
) -> Step<Vec<u8>> {
    let mut code_lengths = vec![0; alphabet_size];
    let mut space: i32 = 1 << MAX_CODE_LENGTH;
    let mut symbol = 0;
    let mut previous_length = DEFAULT_CODE_LENGTH;

    // Consecutive repeat codes extend the previous repetition instead of starting a new one
    let mut repeat = 0;
    let mut repeat_length = 0;

    while symbol < alphabet_size && 0 < space {
        let code = code_length_code.read_symbol(reader)?;

        if code < REPEAT_PREVIOUS_CODE_LENGTH {
            let length = code as u8;
            code_lengths[symbol] = length;
            symbol += 1;
            repeat = 0;

            if length != 0 {
                previous_length = length;
                space -= (1 << MAX_CODE_LENGTH) >> length;
            }
        } else {
            let (extra_bits, length) = if code == REPEAT_PREVIOUS_CODE_LENGTH {
                (2, previous_length)
            } else {
                debug_assert_eq!(code, REPEAT_ZERO_CODE_LENGTH);
                (3, 0)
            };

            if repeat_length != length {
                repeat = 0;
                repeat_length = length;
            }

            let old_repeat = repeat;
            if 0 < repeat {
                repeat = (repeat - 2) << extra_bits;
            }
            repeat += reader.read_bits(extra_bits)? as usize + 3;

            let delta = repeat - old_repeat;
            if alphabet_size < symbol + delta {
                log::warn!("Code length repetition runs past the end of the alphabet");
                return Err(Error::MalformedHuffmanCode.into());
            }

            code_lengths[symbol..symbol + delta].fill(repeat_length);
            symbol += delta;

            if repeat_length != 0 {
                space -= (delta as i32) << (MAX_CODE_LENGTH - usize::from(repeat_length));
            }
        }
    }

    if space != 0 {
        log::warn!("Symbol code lengths do not describe a complete prefix code");
        return Err(Error::MalformedHuffmanCode.into());
    }

    Ok(code_lengths)
}
