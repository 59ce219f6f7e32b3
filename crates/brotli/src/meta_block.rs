//! Stream and meta-block headers, see <https://www.rfc-editor.org/rfc/rfc7932#section-9>

use crate::{
    bit_reader::BitReader,
    block::{BlockSwitcher, Category},
    command::NUM_COMMAND_SYMBOLS,
    context::{read_context_map, ContextMap, ContextMode, DISTANCE_CONTEXTS, LITERAL_CONTEXTS},
    distance::DistanceParameters,
    error::{Error, Interrupt, Step},
    huffman::HuffmanTreeGroup,
    prefix_code::read_prefix_code,
};

pub const NUM_LITERAL_SYMBOLS: usize = 256;

/// Read the size of the sliding window from the stream header
pub fn read_window_bits(reader: &mut BitReader) -> Step<u32> {
    if !reader.read_bit()? {
        return Ok(16);
    }

    let n = reader.read_bits(3)?;
    if n != 0 {
        return Ok(17 + n);
    }

    match reader.read_bits(3)? {
        0 => Ok(17),
        1 => {
            // This would be the large window extension, which is not part of RFC 7932
            log::warn!("Stream uses an invalid window size");
            Err(Error::InvalidWindowSize.into())
        },
        n => Ok(8 + n),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaBlockHeader {
    /// Marks the end of the stream without containing any data
    LastEmpty,

    /// Metadata that is skipped by the decoder
    Metadata { length: usize },

    /// Data that is stored as-is, following the header on the next byte boundary
    Uncompressed { length: usize },

    Compressed { length: usize, is_last: bool },
}

pub fn read_header(reader: &mut BitReader) -> Step<MetaBlockHeader> {
    let is_last = reader.read_bit()?;
    if is_last && reader.read_bit()? {
        return Ok(MetaBlockHeader::LastEmpty);
    }

    let num_nibbles = match reader.read_bits(2)? {
        3 => return read_metadata_header(reader, is_last),
        n => n + 4,
    };

    let mut length = 0;
    for i in 0..num_nibbles {
        let nibble = reader.read_bits(4)? as usize;

        if i + 1 == num_nibbles && 4 < num_nibbles && nibble == 0 {
            log::warn!("Meta-block length uses more nibbles than necessary");
            return Err(Error::InvalidMetaBlockHeader.into());
        }

        length |= nibble << (4 * i);
    }
    let length = length + 1;

    let is_uncompressed = !is_last && reader.read_bit()?;

    if is_uncompressed {
        Ok(MetaBlockHeader::Uncompressed { length })
    } else {
        Ok(MetaBlockHeader::Compressed { length, is_last })
    }
}

fn read_metadata_header(reader: &mut BitReader, is_last: bool) -> Step<MetaBlockHeader> {
    if is_last {
        log::warn!("The last meta-block cannot contain metadata");
        return Err(Error::InvalidMetaBlockHeader.into());
    }

    if reader.read_bit()? {
        log::warn!("Reserved bit in metadata header is set");
        return Err(Error::InvalidMetaBlockHeader.into());
    }

    let num_bytes = reader.read_bits(2)?;
    if num_bytes == 0 {
        return Ok(MetaBlockHeader::Metadata { length: 0 });
    }

    let mut length = 0;
    for i in 0..num_bytes {
        let byte = reader.read_bits(8)? as usize;

        if i + 1 == num_bytes && 1 < num_bytes && byte == 0 {
            log::warn!("Metadata length uses more bytes than necessary");
            return Err(Error::InvalidMetaBlockHeader.into());
        }

        length |= byte << (8 * i);
    }

    Ok(MetaBlockHeader::Metadata { length: length + 1 })
}

/// Skip the padding up to the next byte boundary, which must be all zeros
pub fn skip_padding(reader: &mut BitReader) -> Step {
    if reader.align_to_byte()? != 0 {
        log::warn!("Padding bits are not zero");
        return Err(Error::NonZeroPadding.into());
    }
    Ok(())
}

/// The parts of a compressed meta-block header, in the order in which they appear
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderStage {
    BlockTypes(Category),
    BlockLengths(Category),
    DistanceParameters,
    LiteralContextMap,
    DistanceContextMap,
    LiteralCodes,
    CommandCodes,
    DistanceCodes,
}

impl HeaderStage {
    pub const FIRST: Self = Self::BlockTypes(Category::Literal);
}

/// The state that a compressed meta-block header sets up for decoding its commands
#[derive(Debug, Default)]
pub struct MetaBlock {
    /// Bytes that the meta-block still has to produce
    pub remaining: usize,
    pub is_last: bool,

    pub literal_blocks: BlockSwitcher,
    pub command_blocks: BlockSwitcher,
    pub distance_blocks: BlockSwitcher,

    pub distance_parameters: DistanceParameters,
    pub context_modes: Vec<ContextMode>,
    pub literal_context_map: ContextMap,
    pub distance_context_map: ContextMap,

    pub literal_codes: HuffmanTreeGroup,
    pub command_codes: HuffmanTreeGroup,
    pub distance_codes: HuffmanTreeGroup,
}

impl MetaBlock {
    #[must_use]
    pub fn new(length: usize, is_last: bool) -> Self {
        Self {
            remaining: length,
            is_last,
            ..Self::default()
        }
    }

    fn blocks_mut(&mut self, category: Category) -> &mut BlockSwitcher {
        match category {
            Category::Literal => &mut self.literal_blocks,
            Category::Command => &mut self.command_blocks,
            Category::Distance => &mut self.distance_blocks,
        }
    }

    /// Read one part of the header, returning the stage that follows it.
    ///
    /// Prefix codes are read one at a time so that an interrupted header
    /// does not need to be read again from the start.
    /// `None` means that the header is complete.
    pub fn read_header_stage(
        &mut self,
        stage: HeaderStage,
        reader: &mut BitReader,
    ) -> Step<Option<HeaderStage>> {
        let next = match stage {
            HeaderStage::BlockTypes(category) => {
                *self.blocks_mut(category) = BlockSwitcher::read_types(reader)?;
                HeaderStage::BlockLengths(category)
            },
            HeaderStage::BlockLengths(category) => {
                self.blocks_mut(category).read_first_length(reader)?;
                match category.next() {
                    Some(category) => HeaderStage::BlockTypes(category),
                    None => HeaderStage::DistanceParameters,
                }
            },
            HeaderStage::DistanceParameters => {
                let distance_parameters = DistanceParameters::read(reader)?;

                let mut context_modes = Vec::with_capacity(self.literal_blocks.num_types());
                for _ in 0..self.literal_blocks.num_types() {
                    context_modes.push(ContextMode::from_bits(reader.read_bits(2)?));
                }

                self.distance_parameters = distance_parameters;
                self.context_modes = context_modes;
                HeaderStage::LiteralContextMap
            },
            HeaderStage::LiteralContextMap => {
                let size = LITERAL_CONTEXTS * self.literal_blocks.num_types();
                self.literal_context_map = read_context_map(reader, size)?;
                self.literal_codes = HuffmanTreeGroup::new(
                    NUM_LITERAL_SYMBOLS,
                    self.literal_context_map.num_trees(),
                );
                HeaderStage::DistanceContextMap
            },
            HeaderStage::DistanceContextMap => {
                let size = DISTANCE_CONTEXTS * self.distance_blocks.num_types();
                self.distance_context_map = read_context_map(reader, size)?;
                self.distance_codes = HuffmanTreeGroup::new(
                    self.distance_parameters.alphabet_size(),
                    self.distance_context_map.num_trees(),
                );
                self.command_codes =
                    HuffmanTreeGroup::new(NUM_COMMAND_SYMBOLS, self.command_blocks.num_types());
                HeaderStage::LiteralCodes
            },
            HeaderStage::LiteralCodes => {
                if read_next_code(&mut self.literal_codes, reader)? {
                    HeaderStage::CommandCodes
                } else {
                    HeaderStage::LiteralCodes
                }
            },
            HeaderStage::CommandCodes => {
                if read_next_code(&mut self.command_codes, reader)? {
                    HeaderStage::DistanceCodes
                } else {
                    HeaderStage::CommandCodes
                }
            },
            HeaderStage::DistanceCodes => {
                if read_next_code(&mut self.distance_codes, reader)? {
                    log::trace!(
                        "Meta-block uses {} literal, {} command and {} distance block types",
                        self.literal_blocks.num_types(),
                        self.command_blocks.num_types(),
                        self.distance_blocks.num_types()
                    );
                    return Ok(None);
                } else {
                    HeaderStage::DistanceCodes
                }
            },
        };

        Ok(Some(next))
    }
}

/// Read the next prefix code of a group, returning whether the group is complete afterwards
fn read_next_code(group: &mut HuffmanTreeGroup, reader: &mut BitReader) -> Step<bool> {
    if !group.is_complete() {
        let code = read_prefix_code(reader, group.alphabet_size())?;
        group.push(code);
    }
    Ok(group.is_complete())
}

/// Determine the size of the decompressed data from the first meta-block headers.
///
/// This only succeeds if the size is evident without decoding the stream:
/// * The stream consists of a single compressed meta-block
/// * The stream consists of a single uncompressed meta-block, followed by an empty last meta-block
///
/// `None` is returned for every other stream, including invalid ones.
#[must_use]
pub fn decompressed_size(input: &[u8]) -> Option<usize> {
    let mut reader = BitReader::from_complete_input(input);

    let size = (|| -> Step<Option<usize>> {
        read_window_bits(&mut reader)?;

        match read_header(&mut reader)? {
            MetaBlockHeader::LastEmpty => Ok(Some(0)),
            MetaBlockHeader::Compressed {
                length,
                is_last: true,
            } => Ok(Some(length)),
            MetaBlockHeader::Uncompressed { length } => {
                reader.align_to_byte()?;
                if reader.skip_aligned_bytes(length) != length {
                    return Err(Interrupt::NeedsMoreInput);
                }

                match read_header(&mut reader)? {
                    MetaBlockHeader::LastEmpty => Ok(Some(length)),
                    _ => Ok(None),
                }
            },
            _ => Ok(None),
        }
    })();

    size.ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_writer::BitWriter;

    #[test]
    fn window_sizes() -> Result<(), Interrupt> {
        let cases: [(u32, u32, u32); 5] = [
            (1, 0b0, 16),
            (4, 0b0011, 18),
            (4, 0b1111, 24),
            (7, 0b000_0001, 17),
            (7, 0b111_0001, 15),
        ];

        for (num_bits, bits, expected) in cases {
            let bytes = BitWriter::new().bits(num_bits, bits).finish();
            let mut reader = BitReader::from_complete_input(&bytes);
            assert_eq!(read_window_bits(&mut reader)?, expected);
        }

        // 10 is the smallest allowed window size
        let bytes = BitWriter::new().bits(7, 0b010_0001).finish();
        let mut reader = BitReader::from_complete_input(&bytes);
        assert_eq!(read_window_bits(&mut reader)?, 10);
        Ok(())
    }

    #[test]
    fn large_window_is_rejected() {
        let bytes = BitWriter::new().bits(7, 0b001_0001).finish();
        let mut reader = BitReader::from_complete_input(&bytes);

        assert!(matches!(
            read_window_bits(&mut reader),
            Err(Interrupt::Failed(Error::InvalidWindowSize))
        ));
    }

    #[test]
    fn meta_block_headers() -> Result<(), Interrupt> {
        let bytes = BitWriter::new()
            // ISLAST, ISLASTEMPTY
            .bits(2, 0b11)
            // Not last, 4 nibbles, MLEN - 1 = 0x1234, uncompressed
            .bits(1, 0)
            .bits(2, 0)
            .bits(16, 0x1234)
            .bits(1, 1)
            // Last, 5 nibbles, MLEN - 1 = 0x10000
            .bits(1, 1)
            .bits(1, 0)
            .bits(2, 1)
            .bits(20, 0x10000)
            .finish();
        let mut reader = BitReader::from_complete_input(&bytes);

        assert_eq!(read_header(&mut reader)?, MetaBlockHeader::LastEmpty);
        assert_eq!(
            read_header(&mut reader)?,
            MetaBlockHeader::Uncompressed { length: 0x1235 }
        );
        assert_eq!(
            read_header(&mut reader)?,
            MetaBlockHeader::Compressed {
                length: 0x10001,
                is_last: true
            }
        );
        Ok(())
    }

    #[test]
    fn exuberant_nibble() {
        let bytes = BitWriter::new()
            .bits(1, 0)
            .bits(2, 1)
            .bits(20, 0x0FFFF)
            .finish();
        let mut reader = BitReader::from_complete_input(&bytes);

        assert!(matches!(
            read_header(&mut reader),
            Err(Interrupt::Failed(Error::InvalidMetaBlockHeader))
        ));
    }

    #[test]
    fn metadata_headers() -> Result<(), Interrupt> {
        let bytes = BitWriter::new()
            // No metadata bytes
            .bits(1, 0)
            .bits(2, 3)
            .bits(1, 0)
            .bits(2, 0)
            // Two bytes of length, MSKIPLEN - 1 = 0x0102
            .bits(1, 0)
            .bits(2, 3)
            .bits(1, 0)
            .bits(2, 2)
            .bits(16, 0x0102)
            .finish();
        let mut reader = BitReader::from_complete_input(&bytes);

        assert_eq!(
            read_header(&mut reader)?,
            MetaBlockHeader::Metadata { length: 0 }
        );
        assert_eq!(
            read_header(&mut reader)?,
            MetaBlockHeader::Metadata { length: 0x0103 }
        );
        Ok(())
    }

    #[test]
    fn invalid_metadata_headers() {
        // Reserved bit
        let bytes = BitWriter::new().bits(1, 0).bits(2, 3).bits(1, 1).finish();
        let mut reader = BitReader::from_complete_input(&bytes);
        assert!(matches!(
            read_header(&mut reader),
            Err(Interrupt::Failed(Error::InvalidMetaBlockHeader))
        ));

        // Superfluous zero byte
        let bytes = BitWriter::new()
            .bits(1, 0)
            .bits(2, 3)
            .bits(1, 0)
            .bits(2, 2)
            .bits(16, 0x00FF)
            .finish();
        let mut reader = BitReader::from_complete_input(&bytes);
        assert!(matches!(
            read_header(&mut reader),
            Err(Interrupt::Failed(Error::InvalidMetaBlockHeader))
        ));
    }

    #[test]
    fn size_query() {
        // Empty stream
        assert_eq!(decompressed_size(&[0x06]), Some(0));

        // A single uncompressed "A" followed by an empty last meta-block
        assert_eq!(decompressed_size(&[0x00, 0x00, 0x10, 0x41, 0x03]), Some(1));
        assert_eq!(decompressed_size(&[0x00, 0x00, 0x10, 0x41]), None);

        // Compressed last meta-block with MLEN = 9
        let bytes = BitWriter::new()
            .bits(1, 0)
            .bits(2, 0b01)
            .bits(2, 0)
            .bits(16, 8)
            .finish();
        assert_eq!(decompressed_size(&bytes), Some(9));

        assert_eq!(decompressed_size(&[]), None);
    }
}
