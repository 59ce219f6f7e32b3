//! The static dictionary, see <https://www.rfc-editor.org/rfc/rfc7932#appendix-A>

use brotli_decompressor::dictionary::kBrotliDictionary as DICTIONARY;

use crate::{
    error::Error,
    transform::{NUM_TRANSFORMS, TRANSFORMS},
};

pub const MIN_WORD_LENGTH: usize = 4;
pub const MAX_WORD_LENGTH: usize = 24;

/// Base-2 logarithm of the number of words with a given length
const NDBITS: [u32; MAX_WORD_LENGTH + 1] = [
    0, 0, 0, 0, 10, 10, 11, 11, 10, 10, 10, 10, 10, 9, 9, 8, 7, 7, 8, 7, 7, 6, 6, 5, 5,
];

/// Offset into the dictionary for the group of words with a given length
const DOFFSET: [usize; MAX_WORD_LENGTH + 1] = word_offsets();

const fn word_offsets() -> [usize; MAX_WORD_LENGTH + 1] {
    let mut offsets = [0; MAX_WORD_LENGTH + 1];

    let mut length = MIN_WORD_LENGTH;
    while length < MAX_WORD_LENGTH {
        offsets[length + 1] = offsets[length] + length * (1 << NDBITS[length]);
        length += 1;
    }

    offsets
}

/// Resolve a reference into the static dictionary and append the transformed word to `output`.
///
/// The lookup fails if the length is not in the range `[4, 24]` or the transform id is invalid.
pub fn lookup(word_id: usize, length: usize, output: &mut Vec<u8>) -> Result<(), Error> {
    if !(MIN_WORD_LENGTH..=MAX_WORD_LENGTH).contains(&length) {
        log::warn!("Dictionary word length {length} is out of range");
        return Err(Error::InvalidDictionaryReference { word_id, length });
    }

    let index = word_id & ((1 << NDBITS[length]) - 1);
    let transform_id = word_id >> NDBITS[length];

    if NUM_TRANSFORMS <= transform_id {
        log::warn!("Invalid transform id: {transform_id}");
        return Err(Error::InvalidDictionaryReference { word_id, length });
    }

    let offset = DOFFSET[length] + index * length;
    let word = &DICTIONARY[offset..offset + length];
    TRANSFORMS[transform_id].apply(word, output);

    Ok(())
}
