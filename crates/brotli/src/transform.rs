//! Word transformations for the static dictionary, see RFC 7932, section 8

use WordTransform::{Identity, OmitFirst, OmitLast, UppercaseAll, UppercaseFirst};

pub const NUM_TRANSFORMS: usize = 121;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordTransform {
    Identity,
    UppercaseFirst,
    UppercaseAll,
    OmitFirst(usize),
    OmitLast(usize),
}

/// A dictionary word is emitted as `prefix + word_transform(word) + suffix`
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    prefix: &'static [u8],
    word_transform: WordTransform,
    suffix: &'static [u8],
}

const fn transform(
    prefix: &'static [u8],
    word_transform: WordTransform,
    suffix: &'static [u8],
) -> Transform {
    Transform {
        prefix,
        word_transform,
        suffix,
    }
}

impl Transform {
    /// Append the transformed `word` to `output`
    pub fn apply(&self, word: &[u8], output: &mut Vec<u8>) {
        output.extend_from_slice(self.prefix);

        let start = output.len();
        match self.word_transform {
            Identity => output.extend_from_slice(word),
            UppercaseFirst => {
                output.extend_from_slice(word);
                if start < output.len() {
                    uppercase(&mut output[start..], 0);
                }
            },
            UppercaseAll => {
                output.extend_from_slice(word);

                let mut position = start;
                while position < output.len() {
                    position += uppercase(&mut output[start..], position - start);
                }
            },
            OmitFirst(n) => output.extend_from_slice(word.get(n..).unwrap_or_default()),
            OmitLast(n) => output.extend_from_slice(&word[..word.len().saturating_sub(n)]),
        }

        output.extend_from_slice(self.suffix);
    }
}

/// Uppercase the (possibly multibyte) UTF-8 character at `position`.
///
/// This is the "Ferment" operation from the RFC, it only deals with ASCII and a simplified
/// mapping for two and three byte sequences.
/// Returns the number of bytes that make up the character.
fn uppercase(word: &mut [u8], position: usize) -> usize {
    let remaining = word.len() - position;

    if word[position] < 192 {
        if word[position].is_ascii_lowercase() {
            word[position] ^= 32;
        }
        1
    } else if word[position] < 224 {
        if 2 <= remaining {
            word[position + 1] ^= 32;
        }
        2.min(remaining)
    } else {
        if 3 <= remaining {
            word[position + 2] ^= 5;
        }
        3.min(remaining)
    }
}

pub static TRANSFORMS: [Transform; NUM_TRANSFORMS] = [
    transform(b"", Identity, b""),
    transform(b"", Identity, b" "),
    transform(b" ", Identity, b" "),
    transform(b"", OmitFirst(1), b""),
    transform(b"", UppercaseFirst, b" "),
    transform(b"", Identity, b" the "),
    transform(b" ", Identity, b""),
    transform(b"s ", Identity, b" "),
    transform(b"", Identity, b" of "),
    transform(b"", UppercaseFirst, b""),
    transform(b"", Identity, b" and "),
    transform(b"", OmitFirst(2), b""),
    transform(b"", OmitLast(1), b""),
    transform(b", ", Identity, b" "),
    transform(b"", Identity, b", "),
    transform(b" ", UppercaseFirst, b" "),
    transform(b"", Identity, b" in "),
    transform(b"", Identity, b" to "),
    transform(b"e ", Identity, b" "),
    transform(b"", Identity, b"\""),
    transform(b"", Identity, b"."),
    transform(b"", Identity, b"\">"),
    transform(b"", Identity, b"\n"),
    transform(b"", OmitLast(3), b""),
    transform(b"", Identity, b"]"),
    transform(b"", Identity, b" for "),
    transform(b"", OmitFirst(3), b""),
    transform(b"", OmitLast(2), b""),
    transform(b"", Identity, b" a "),
    transform(b"", Identity, b" that "),
    transform(b" ", UppercaseFirst, b""),
    transform(b"", Identity, b". "),
    transform(b".", Identity, b""),
    transform(b" ", Identity, b", "),
    transform(b"", OmitFirst(4), b""),
    transform(b"", Identity, b" with "),
    transform(b"", Identity, b"'"),
    transform(b"", Identity, b" from "),
    transform(b"", Identity, b" by "),
    transform(b"", OmitFirst(5), b""),
    transform(b"", OmitFirst(6), b""),
    transform(b" the ", Identity, b""),
    transform(b"", OmitLast(4), b""),
    transform(b"", Identity, b". The "),
    transform(b"", UppercaseAll, b""),
    transform(b"", Identity, b" on "),
    transform(b"", Identity, b" as "),
    transform(b"", Identity, b" is "),
    transform(b"", OmitLast(7), b""),
    transform(b"", OmitLast(1), b"ing "),
    transform(b"", Identity, b"\n\t"),
    transform(b"", Identity, b":"),
    transform(b" ", Identity, b". "),
    transform(b"", Identity, b"ed "),
    transform(b"", OmitFirst(9), b""),
    transform(b"", OmitFirst(7), b""),
    transform(b"", OmitLast(6), b""),
    transform(b"", Identity, b"("),
    transform(b"", UppercaseFirst, b", "),
    transform(b"", OmitLast(8), b""),
    transform(b"", Identity, b" at "),
    transform(b"", Identity, b"ly "),
    transform(b" the ", Identity, b" of "),
    transform(b"", OmitLast(5), b""),
    transform(b"", OmitLast(9), b""),
    transform(b" ", UppercaseFirst, b", "),
    transform(b"", UppercaseFirst, b"\""),
    transform(b".", Identity, b"("),
    transform(b"", UppercaseAll, b" "),
    transform(b"", UppercaseFirst, b"\">"),
    transform(b"", Identity, b"=\""),
    transform(b" ", Identity, b"."),
    transform(b".com/", Identity, b""),
    transform(b" the ", Identity, b" of the "),
    transform(b"", UppercaseFirst, b"'"),
    transform(b"", Identity, b". This "),
    transform(b"", Identity, b","),
    transform(b".", Identity, b" "),
    transform(b"", UppercaseFirst, b"("),
    transform(b"", UppercaseFirst, b"."),
    transform(b"", Identity, b" not "),
    transform(b" ", Identity, b"=\""),
    transform(b"", Identity, b"er "),
    transform(b" ", UppercaseAll, b" "),
    transform(b"", Identity, b"al "),
    transform(b" ", UppercaseAll, b""),
    transform(b"", Identity, b"='"),
    transform(b"", UppercaseAll, b"\""),
    transform(b"", UppercaseFirst, b". "),
    transform(b" ", Identity, b"("),
    transform(b"", Identity, b"ful "),
    transform(b" ", UppercaseFirst, b". "),
    transform(b"", Identity, b"ive "),
    transform(b"", Identity, b"less "),
    transform(b"", UppercaseAll, b"'"),
    transform(b"", Identity, b"est "),
    transform(b" ", UppercaseFirst, b"."),
    transform(b"", UppercaseAll, b"\">"),
    transform(b" ", Identity, b"='"),
    transform(b"", UppercaseFirst, b","),
    transform(b"", Identity, b"ize "),
    transform(b"", UppercaseAll, b"."),
    transform(b"\xc2\xa0", Identity, b""),
    transform(b" ", Identity, b","),
    transform(b"", UppercaseFirst, b"=\""),
    transform(b"", UppercaseAll, b"=\""),
    transform(b"", Identity, b"ous "),
    transform(b"", UppercaseAll, b", "),
    transform(b"", UppercaseFirst, b"='"),
    transform(b" ", UppercaseFirst, b","),
    transform(b" ", UppercaseAll, b"=\""),
    transform(b" ", UppercaseAll, b", "),
    transform(b"", UppercaseAll, b","),
    transform(b"", UppercaseAll, b"("),
    transform(b"", UppercaseAll, b". "),
    transform(b" ", UppercaseAll, b"."),
    transform(b"", UppercaseAll, b"='"),
    transform(b" ", UppercaseAll, b". "),
    transform(b" ", UppercaseFirst, b"=\""),
    transform(b" ", UppercaseAll, b"='"),
    transform(b" ", UppercaseFirst, b"='"),
];
