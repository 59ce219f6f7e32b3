//! Decoding of small, hand-assembled streams

mod common;

use brotli_decode::{decompress, decompressed_size, Decoder, Error, Status};
use common::BitWriter;

/// A single uncompressed meta-block containing "A", followed by an empty final meta-block
const UNCOMPRESSED_A: [u8; 5] = [0x00, 0x00, 0x10, 0x41, 0x03];

/// The pieces of a compressed meta-block that uses one block type and one prefix code per category
struct MetaBlock<'a> {
    length: u32,
    num_direct: u32,

    /// Symbols of a simple literal code, with code lengths 1, 2 and 2 for three symbols
    literals: &'a [u8],
    command: u32,
    distance_bits: u32,
    distance: u32,
}

impl MetaBlock<'_> {
    /// Write the header of a final compressed meta-block
    fn write_header(&self, writer: &mut BitWriter) {
        // ISLAST, not ISLASTEMPTY, four nibbles of MLEN - 1
        writer.bits(1, 1).bits(1, 0).bits(2, 0).bits(16, self.length - 1);

        // One block type for literals, commands and distances
        writer.bits(1, 0).bits(1, 0).bits(1, 0);

        // NPOSTFIX, NDIRECT
        writer.bits(2, 0).bits(4, self.num_direct);

        // Context mode of the single literal block type
        writer.bits(2, 0);

        // One tree for literals and distances each
        writer.bits(1, 0).bits(1, 0);

        writer
            .bits(2, 1)
            .bits(2, self.literals.len() as u32 - 1);
        for &literal in self.literals {
            writer.bits(8, literal.into());
        }

        writer.bits(2, 1).bits(2, 0).bits(10, self.command);
        writer
            .bits(2, 1)
            .bits(2, 0)
            .bits(self.distance_bits, self.distance);
    }
}

/// Insert "abc" and copy six bytes from three bytes back
const ABC: MetaBlock<'static> = MetaBlock {
    length: 9,
    num_direct: 0,
    literals: b"abc",
    command: 156,
    distance_bits: 6,

    // Last distance minus one
    distance: 4,
};

fn write_abc_literals(writer: &mut BitWriter) {
    writer.code(1, 0b0).code(2, 0b10).code(2, 0b11);
}

fn abc_stream(meta_block: &MetaBlock<'_>) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.bits(1, 0);
    meta_block.write_header(&mut writer);
    write_abc_literals(&mut writer);
    writer.finish()
}

#[test]
fn empty_stream() -> Result<(), Error> {
    assert_eq!(decompress(&[0x06])?, b"");
    assert_eq!(decompressed_size(&[0x06]), Some(0));
    Ok(())
}

#[test]
fn uncompressed_meta_block() -> Result<(), Error> {
    assert_eq!(decompress(&UNCOMPRESSED_A)?, b"A");
    assert_eq!(decompressed_size(&UNCOMPRESSED_A), Some(1));
    Ok(())
}

#[test]
fn compressed_meta_block() -> Result<(), Error> {
    let stream = abc_stream(&ABC);

    assert_eq!(decompress(&stream)?, b"abcabcabc");
    assert_eq!(decompressed_size(&stream), Some(9));
    Ok(())
}

#[test]
fn short_and_direct_distance_codes_agree() -> Result<(), Error> {
    // The 16 short codes are followed by 4 direct codes, code 18 is distance 3
    let direct = MetaBlock {
        num_direct: 4,
        distance_bits: 7,
        distance: 18,
        ..ABC
    };

    assert_eq!(decompress(&abc_stream(&direct))?, decompress(&abc_stream(&ABC))?);
    Ok(())
}

#[test]
fn uncompressed_then_compressed_meta_block() -> Result<(), Error> {
    let mut writer = BitWriter::new();

    // WBITS, not ISLAST, four nibbles, MLEN - 1 = 0, ISUNCOMPRESSED, padding
    writer
        .bits(1, 0)
        .bits(1, 0)
        .bits(2, 0)
        .bits(16, 0)
        .bits(1, 1)
        .bits(3, 0)
        .bits(8, b'A'.into());

    ABC.write_header(&mut writer);
    write_abc_literals(&mut writer);
    let stream = writer.finish();

    assert_eq!(decompress(&stream)?, b"Aabcabcabc");

    // The size query only looks at the first meta-block if the second one is empty
    assert_eq!(decompressed_size(&stream), None);
    Ok(())
}

#[test]
fn metadata_is_skipped() -> Result<(), Error> {
    let mut writer = BitWriter::new();

    // WBITS, not ISLAST, MNIBBLES = 0 selects metadata, reserved bit, MSKIPBYTES = 1,
    // MSKIPLEN - 1 = 2, padding
    writer
        .bits(1, 0)
        .bits(1, 0)
        .bits(2, 3)
        .bits(1, 0)
        .bits(2, 1)
        .bits(8, 2)
        .bits(1, 0);
    writer.bits(8, 0xAA).bits(8, 0xBB).bits(8, 0xCC);

    // ISLAST, ISLASTEMPTY
    writer.bits(2, 0b11);

    assert_eq!(decompress(&writer.finish())?, b"");
    Ok(())
}

#[test]
fn dictionary_words() -> Result<(), Error> {
    // Insert nothing, copy 4 bytes. The distance reaches past the start of the output
    // and selects a word from the static dictionary.
    let time = MetaBlock {
        length: 4,
        num_direct: 0,
        literals: b"a",
        command: 130,
        distance_bits: 6,
        distance: 16,
    };

    let mut writer = BitWriter::new();
    writer.bits(1, 0);
    time.write_header(&mut writer);
    writer.bits(1, 0);
    assert_eq!(decompress(&writer.finish())?, b"time");

    // Word 0 with transform 9, which uppercases the first letter
    let mut writer = BitWriter::new();
    writer.bits(1, 0);
    MetaBlock {
        distance: 38,
        ..time
    }
    .write_header(&mut writer);
    writer.bits(12, 1028);
    assert_eq!(decompress(&writer.finish())?, b"Time");

    // Word 0 with transform 116: uppercase everything and append "='" without a prefix.
    // Distance code 45 has 15 extra bits, ((3 << 15) - 4) + 20484 + 1 = (116 << 10) + 1
    let mut writer = BitWriter::new();
    writer.bits(1, 0);
    MetaBlock {
        length: 6,
        distance: 45,
        ..time
    }
    .write_header(&mut writer);
    writer.bits(15, 20484);
    assert_eq!(decompress(&writer.finish())?, b"TIME='");
    Ok(())
}

#[test]
fn streaming_one_byte_at_a_time() -> Result<(), Error> {
    let stream = abc_stream(&ABC);
    let mut decoder = Decoder::new();
    let mut output = vec![];

    for (i, byte) in stream.iter().enumerate() {
        let mut buffer = [0; 1];
        let mut progress = decoder.decompress(&[*byte], &mut buffer, i + 1 == stream.len())?;
        output.extend_from_slice(&buffer[..progress.bytes_written]);

        while progress.status == Status::NeedsMoreOutput {
            progress = decoder.decompress(&[], &mut buffer, i + 1 == stream.len())?;
            output.extend_from_slice(&buffer[..progress.bytes_written]);
        }
    }

    assert!(decoder.is_done());
    assert_eq!(output, b"abcabcabc");
    Ok(())
}

#[test]
fn non_zero_padding() {
    let stream = [0x00, 0x00, 0x30, 0x41, 0x03];
    assert!(matches!(decompress(&stream), Err(Error::NonZeroPadding)));
}

#[test]
fn exuberant_nibble() {
    // Five nibbles, the most significant one is zero
    let stream = BitWriter::new()
        .bits(1, 0)
        .bits(1, 0)
        .bits(2, 1)
        .bits(20, 0x0FFFF)
        .finish();

    assert!(matches!(
        decompress(&stream),
        Err(Error::InvalidMetaBlockHeader)
    ));
}

#[test]
fn large_window() {
    let stream = BitWriter::new().bits(7, 0b001_0001).finish();
    assert!(matches!(decompress(&stream), Err(Error::InvalidWindowSize)));
}

#[test]
fn duplicate_literal_symbols() {
    let stream = abc_stream(&MetaBlock {
        literals: b"aba",
        ..ABC
    });
    assert!(matches!(
        decompress(&stream),
        Err(Error::MalformedHuffmanCode)
    ));
}

#[test]
fn copy_exceeds_meta_block() {
    let stream = abc_stream(&MetaBlock { length: 6, ..ABC });
    assert!(matches!(
        decompress(&stream),
        Err(Error::ExceedsMetaBlockLength {
            length: 6,
            remaining: 3
        })
    ));
}

#[test]
fn dictionary_word_too_short() {
    // Command 128 copies two bytes, which is shorter than any dictionary word
    let mut writer = BitWriter::new();
    writer.bits(1, 0);
    MetaBlock {
        length: 2,
        num_direct: 0,
        literals: b"a",
        command: 128,
        distance_bits: 6,
        distance: 16,
    }
    .write_header(&mut writer);
    writer.bits(1, 0);

    assert!(matches!(
        decompress(&writer.finish()),
        Err(Error::InvalidDictionaryReference {
            word_id: 0,
            length: 2
        })
    ));
}

#[test]
fn truncated_stream() {
    let stream = abc_stream(&ABC);

    for length in 0..stream.len() {
        assert!(
            matches!(decompress(&stream[..length]), Err(Error::TruncatedInput)),
            "prefix of length {length} was accepted"
        );
    }
}
