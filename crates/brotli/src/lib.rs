//! A decoder for the [Brotli](https://datatracker.ietf.org/doc/html/rfc7932) compressed data format
//!
//! # Example
//! ```
//! // A stream with a single uncompressed meta-block
//! let compressed = [0x00, 0x00, 0x10, 0x41, 0x03];
//! let decompressed = brotli_decode::decompress(&compressed)?;
//! assert_eq!(decompressed, b"A");
//! # Ok::<(), brotli_decode::Error>(())
//! ```

mod bit_reader;
mod block;
mod command;
mod context;
mod decoder;
mod dictionary;
mod distance;
mod error;
mod huffman;
mod meta_block;
mod prefix_code;
mod ring_buffer;
mod transform;

#[cfg(test)]
mod bit_writer;

pub use decoder::{Decoder, Progress, Status};
pub use error::Error;
pub use meta_block::decompressed_size;

use std::io::{self, Read, Write};

/// Size of the chunks that the convenience functions hand to the [Decoder]
const CHUNK_SIZE: usize = 1 << 16;

/// Decompress a complete stream
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = Decoder::new();
    let mut output = Vec::new();
    let mut chunk = vec![0; CHUNK_SIZE];
    let mut input = input;

    loop {
        let progress = decoder.decompress(input, &mut chunk, true)?;
        input = &[];
        output.extend_from_slice(&chunk[..progress.bytes_written]);

        match progress.status {
            Status::Done => return Ok(output),
            Status::NeedsMoreOutput => {},
            Status::NeedsMoreInput => return Err(Error::TruncatedInput),
        }
    }
}

/// Decompress a complete stream into `output`, returning the size of the decompressed data
pub fn decompress_into(input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
    let progress = Decoder::new().decompress(input, output, true)?;

    match progress.status {
        Status::Done => Ok(progress.bytes_written),
        Status::NeedsMoreOutput => Err(Error::OutputBufferTooSmall),
        Status::NeedsMoreInput => Err(Error::TruncatedInput),
    }
}

/// Decompress everything `source` provides into `sink`, returning the number of bytes written
pub fn decompress_stream<R: Read, W: Write>(mut source: R, mut sink: W) -> Result<u64, Error> {
    let mut decoder = Decoder::new();
    let mut input = vec![0; CHUNK_SIZE];
    let mut output = vec![0; CHUNK_SIZE];
    let mut total_written = 0;

    // The first call only sets up the decoder
    let mut bytes_available = 0;
    let mut end_of_input = false;

    loop {
        let progress = decoder.decompress(&input[..bytes_available], &mut output, end_of_input)?;
        bytes_available = 0;

        write_to_sink(&mut sink, &output[..progress.bytes_written])?;
        total_written += progress.bytes_written as u64;

        match progress.status {
            Status::Done => break,
            Status::NeedsMoreOutput => {},
            Status::NeedsMoreInput => {
                if end_of_input {
                    return Err(Error::TruncatedInput);
                }

                bytes_available = read_from_source(&mut source, &mut input)?;
                end_of_input = bytes_available == 0;
            },
        }
    }

    sink.flush()?;
    Ok(total_written)
}

fn read_from_source<R: Read>(source: &mut R, buffer: &mut [u8]) -> Result<usize, Error> {
    loop {
        match source.read(buffer) {
            Ok(n) => return Ok(n),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {},
            Err(error) => return Err(error.into()),
        }
    }
}

fn write_to_sink<W: Write>(sink: &mut W, bytes: &[u8]) -> Result<(), Error> {
    sink.write_all(bytes).map_err(|error| {
        if error.kind() == io::ErrorKind::WriteZero {
            log::warn!("Output sink stopped accepting data");
            Error::SinkRejectedOutput
        } else {
            error.into()
        }
    })
}
