//! The resumable decompression state machine.
//!
//! Decoding is split into small steps. Every step either completes and commits its
//! effects, or is interrupted because input or output space ran out. In the latter case
//! the bit reader is rewound to where the step started, so that the step can simply be
//! repeated once the caller provides more input or output space.

use crate::{
    bit_reader::BitReader,
    command::read_command,
    context::{distance_context, DISTANCE_CONTEXTS, LITERAL_CONTEXTS},
    dictionary,
    distance::{read_distance, DistanceRing},
    error::{Error, Interrupt, Step},
    meta_block::{
        read_header, read_window_bits, skip_padding, HeaderStage, MetaBlock, MetaBlockHeader,
    },
    ring_buffer::RingBuffer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The stream is complete and all output was written
    Done,

    /// All input was consumed, decoding continues once more input is provided
    NeedsMoreInput,

    /// The output buffer is full, decoding continues once more output space is provided
    NeedsMoreOutput,
}

/// The outcome of a call to [Decoder::decompress]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub status: Status,

    /// Number of input bytes that were taken over by the decoder
    pub bytes_read: usize,

    /// Number of bytes that were written to the output buffer
    pub bytes_written: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    StreamHeader,
    MetaBlockHeader,
    Metadata { remaining: usize },
    Uncompressed { remaining: usize },
    CompressedHeader(HeaderStage),
    Command,
    Literals,
    Distance,
    Copy,
    DictionaryWord,
    MetaBlockDone,
    Done,
    Failed,
}

/// The command that is currently being executed
#[derive(Clone, Copy, Debug, Default)]
struct PendingCommand {
    insert_remaining: usize,
    copy_length: usize,
    uses_last_distance: bool,
    distance: usize,
    copy_remaining: usize,
}

/// A streaming Brotli decoder
#[derive(Debug)]
pub struct Decoder {
    state: State,
    reader: BitReader,
    window: RingBuffer,

    /// Maximum distance of a backward reference, larger distances refer to the static dictionary
    max_backward_distance: usize,
    distances: DistanceRing,
    meta_block: MetaBlock,
    command: PendingCommand,

    /// A transformed dictionary word that is not fully written yet
    word: Vec<u8>,
    word_position: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::StreamHeader,
            reader: BitReader::new(),
            window: RingBuffer::default(),
            max_backward_distance: 0,
            distances: DistanceRing::default(),
            meta_block: MetaBlock::default(),
            command: PendingCommand::default(),
            word: Vec::new(),
            word_position: 0,
        }
    }

    /// Whether the end of the stream was decoded and all output was handed out
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == State::Done && self.window.unflushed() == 0
    }

    /// Decompress as much as possible.
    ///
    /// All of `input` is taken over by the decoder, bytes that cannot be used yet are kept around
    /// for the next call. `end_of_input` signals that no more input will follow, running out of
    /// input is an error after that. Any data following the end of the stream is ignored.
    ///
    /// After an error, the decoder must not be used anymore.
    pub fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        end_of_input: bool,
    ) -> Result<Progress, Error> {
        if self.state == State::Failed {
            return Err(Error::Poisoned);
        }

        self.reader.push_input(input);
        if end_of_input {
            self.reader.set_end_of_input();
        }

        let mut written = 0;
        let status = loop {
            written += self.window.flush_into(&mut output[written..]);

            if self.state == State::Done {
                if self.window.unflushed() == 0 {
                    break Status::Done;
                }
                break Status::NeedsMoreOutput;
            }

            let checkpoint = self.reader.checkpoint();
            match self.step() {
                Ok(()) => {},
                Err(Interrupt::NeedsMoreInput) => {
                    self.reader.restore(checkpoint);
                    break Status::NeedsMoreInput;
                },
                Err(Interrupt::NeedsMoreOutput) => {
                    self.reader.restore(checkpoint);

                    // The next iteration flushes the window if there is space left
                    if written == output.len() {
                        break Status::NeedsMoreOutput;
                    }
                },
                Err(Interrupt::Failed(error)) => {
                    log::warn!("Brotli decompression failed: {error}");
                    self.state = State::Failed;
                    return Err(error);
                },
            }
        };

        Ok(Progress {
            status,
            bytes_read: input.len(),
            bytes_written: written,
        })
    }

    fn step(&mut self) -> Step {
        match self.state {
            State::StreamHeader => {
                let window_bits = read_window_bits(&mut self.reader)?;
                log::debug!("Brotli stream uses a window of {} bytes", 1 << window_bits);

                self.window = RingBuffer::new(window_bits);
                self.max_backward_distance = (1 << window_bits) - 16;
                self.state = State::MetaBlockHeader;
            },
            State::MetaBlockHeader => self.read_meta_block_header()?,
            State::Metadata { remaining } => {
                if remaining == 0 {
                    self.state = State::MetaBlockHeader;
                    return Ok(());
                }

                let skipped = self.reader.skip_aligned_bytes(remaining);
                if skipped == 0 {
                    return Err(self.reader.exhausted());
                }
                self.state = State::Metadata {
                    remaining: remaining - skipped,
                };
            },
            State::Uncompressed { remaining } => {
                if remaining == 0 {
                    self.state = State::MetaBlockHeader;
                    return Ok(());
                }

                let space = self.window.spare_space(remaining);
                if space.is_empty() {
                    return Err(Interrupt::NeedsMoreOutput);
                }

                let copied = self.reader.read_aligned_bytes(space);
                if copied == 0 {
                    return Err(self.reader.exhausted());
                }

                self.window.commit(copied);
                self.state = State::Uncompressed {
                    remaining: remaining - copied,
                };
            },
            State::CompressedHeader(stage) => {
                self.state = match self.meta_block.read_header_stage(stage, &mut self.reader)? {
                    Some(next) => State::CompressedHeader(next),
                    None => State::Command,
                };
            },
            State::Command => self.read_command()?,
            State::Literals => self.read_literals()?,
            State::Distance => self.read_distance()?,
            State::Copy => self.copy()?,
            State::DictionaryWord => self.copy_dictionary_word()?,
            State::MetaBlockDone => {
                if self.meta_block.is_last {
                    skip_padding(&mut self.reader)?;
                    log::debug!(
                        "Brotli stream complete, {} bytes decompressed",
                        self.window.position()
                    );
                    self.state = State::Done;
                } else {
                    self.state = State::MetaBlockHeader;
                }
            },
            State::Done | State::Failed => {},
        }

        Ok(())
    }

    fn read_meta_block_header(&mut self) -> Step {
        let header = read_header(&mut self.reader)?;
        log::trace!("{header:?}");

        match header {
            MetaBlockHeader::LastEmpty => {
                skip_padding(&mut self.reader)?;
                self.state = State::Done;
            },
            MetaBlockHeader::Metadata { length } => {
                skip_padding(&mut self.reader)?;
                self.state = State::Metadata { remaining: length };
            },
            MetaBlockHeader::Uncompressed { length } => {
                skip_padding(&mut self.reader)?;
                self.state = State::Uncompressed { remaining: length };
            },
            MetaBlockHeader::Compressed { length, is_last } => {
                self.meta_block = MetaBlock::new(length, is_last);
                self.state = State::CompressedHeader(HeaderStage::FIRST);
            },
        }

        Ok(())
    }

    fn read_command(&mut self) -> Step {
        let meta_block = &mut self.meta_block;
        let blocks = &mut meta_block.command_blocks;

        if blocks.needs_switch() {
            return blocks.switch(&mut self.reader);
        }

        let code = meta_block.command_codes.get(blocks.block_type());
        let command = read_command(&mut self.reader, code)?;
        blocks.consume();

        if meta_block.remaining < command.insert_length {
            log::warn!(
                "Inserting {} literals exceeds the meta-block",
                command.insert_length
            );
            return Err(Error::ExceedsMetaBlockLength {
                length: command.insert_length,
                remaining: meta_block.remaining,
            }
            .into());
        }

        self.command = PendingCommand {
            insert_remaining: command.insert_length,
            copy_length: command.copy_length,
            uses_last_distance: command.uses_last_distance,
            ..PendingCommand::default()
        };
        self.state = State::Literals;
        Ok(())
    }

    /// Decode literals until the insert length of the current command is reached
    fn read_literals(&mut self) -> Step {
        let mut made_progress = false;

        loop {
            if self.command.insert_remaining == 0 {
                // The last command of a meta-block may end without a copy
                self.state = if self.meta_block.remaining == 0 {
                    State::MetaBlockDone
                } else {
                    State::Distance
                };
                return Ok(());
            }

            let checkpoint = self.reader.checkpoint();
            match self.read_literal() {
                Ok(()) => made_progress = true,
                Err(Interrupt::Failed(error)) => return Err(error.into()),
                Err(interrupt) => {
                    if !made_progress {
                        return Err(interrupt);
                    }

                    // Keep the literals that were decoded so far
                    self.reader.restore(checkpoint);
                    return Ok(());
                },
            }
        }
    }

    fn read_literal(&mut self) -> Step {
        if self.window.free_space() == 0 {
            return Err(Interrupt::NeedsMoreOutput);
        }

        let meta_block = &mut self.meta_block;
        let blocks = &mut meta_block.literal_blocks;

        if blocks.needs_switch() {
            return blocks.switch(&mut self.reader);
        }

        let block_type = blocks.block_type();
        let context = meta_block.context_modes[block_type]
            .literal_context(self.window.last_byte(0), self.window.last_byte(1));
        let tree = meta_block
            .literal_context_map
            .tree(block_type, LITERAL_CONTEXTS, context);

        let literal = meta_block.literal_codes.get(tree).read_symbol(&mut self.reader)?;
        blocks.consume();

        self.window.push(literal as u8);
        self.command.insert_remaining -= 1;
        meta_block.remaining -= 1;
        Ok(())
    }

    fn read_distance(&mut self) -> Step {
        let meta_block = &mut self.meta_block;
        let command = self.command;

        let (distance, code) = if command.uses_last_distance {
            (self.distances.last(), 0)
        } else {
            let blocks = &mut meta_block.distance_blocks;
            if blocks.needs_switch() {
                return blocks.switch(&mut self.reader);
            }

            let context = distance_context(command.copy_length);
            let tree = meta_block
                .distance_context_map
                .tree(blocks.block_type(), DISTANCE_CONTEXTS, context);
            let code = meta_block
                .distance_codes
                .get(tree)
                .read_symbol(&mut self.reader)?;
            let code = usize::from(code);

            let distance = read_distance(
                &mut self.reader,
                code,
                &meta_block.distance_parameters,
                &self.distances,
            )?;
            blocks.consume();
            (distance, code)
        };

        let max_distance = self.window.position().min(self.max_backward_distance);

        if distance <= max_distance {
            if meta_block.remaining < command.copy_length {
                log::warn!("Copying {} bytes exceeds the meta-block", command.copy_length);
                return Err(Error::ExceedsMetaBlockLength {
                    length: command.copy_length,
                    remaining: meta_block.remaining,
                }
                .into());
            }

            // Repeating the last distance does not change the ring of recent distances
            if code != 0 {
                self.distances.push(distance);
            }

            self.command.distance = distance;
            self.command.copy_remaining = command.copy_length;
            self.state = State::Copy;
        } else {
            let word_id = distance - max_distance - 1;

            self.word.clear();
            self.word_position = 0;
            dictionary::lookup(word_id, command.copy_length, &mut self.word)?;

            if meta_block.remaining < self.word.len() {
                log::warn!(
                    "Dictionary word of length {} exceeds the meta-block",
                    self.word.len()
                );
                return Err(Error::ExceedsMetaBlockLength {
                    length: self.word.len(),
                    remaining: meta_block.remaining,
                }
                .into());
            }

            self.state = State::DictionaryWord;
        }

        Ok(())
    }

    fn copy(&mut self) -> Step {
        if self.command.copy_remaining == 0 {
            self.finish_command();
            return Ok(());
        }

        let copied = self
            .window
            .copy_backward(self.command.distance, self.command.copy_remaining);
        if copied == 0 {
            return Err(Interrupt::NeedsMoreOutput);
        }

        self.command.copy_remaining -= copied;
        self.meta_block.remaining -= copied;
        Ok(())
    }

    fn copy_dictionary_word(&mut self) -> Step {
        if self.word_position == self.word.len() {
            self.finish_command();
            return Ok(());
        }

        let written = self.window.write(&self.word[self.word_position..]);
        if written == 0 {
            return Err(Interrupt::NeedsMoreOutput);
        }

        self.word_position += written;
        self.meta_block.remaining -= written;
        Ok(())
    }

    fn finish_command(&mut self) {
        self.state = if self.meta_block.remaining == 0 {
            State::MetaBlockDone
        } else {
            State::Command
        };
    }
}
