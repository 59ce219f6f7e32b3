use error_derive::Error;

use std::io;

#[derive(Debug, Error)]
pub enum Error {
    #[msg = "invalid window size in stream header"]
    InvalidWindowSize,

    #[msg = "invalid meta-block header"]
    InvalidMetaBlockHeader,

    #[msg = "padding bits are not zero"]
    NonZeroPadding,

    #[msg = "malformed huffman code"]
    MalformedHuffmanCode,

    #[msg = "invalid context map"]
    InvalidContextMap,

    #[msg = "input ended before the stream was complete"]
    TruncatedInput,

    #[msg = "backward reference resolves to a non-positive distance"]
    InvalidBackwardReference,

    #[msg = "command of length {length} exceeds the {remaining} bytes left in the meta-block"]
    ExceedsMetaBlockLength { length: usize, remaining: usize },

    #[msg = "invalid dictionary reference to word {word_id} with length {length}"]
    InvalidDictionaryReference { word_id: usize, length: usize },

    #[msg = "output sink did not accept all decoded bytes"]
    SinkRejectedOutput,

    #[msg = "output buffer is too small for the decompressed data"]
    OutputBufferTooSmall,

    #[msg = "decoder was used after it reported an error"]
    Poisoned,

    #[msg = "io error"]
    Io(io::Error),
}

/// Reasons for a decoding step to stop before it completed
#[derive(Debug)]
pub(crate) enum Interrupt {
    NeedsMoreInput,
    NeedsMoreOutput,
    Failed(Error),
}

impl From<Error> for Interrupt {
    fn from(error: Error) -> Self {
        Self::Failed(error)
    }
}

pub(crate) type Step<T = ()> = Result<T, Interrupt>;
