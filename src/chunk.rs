//! Chunk framing. A [`ChunkReader`] walks the top level of a Standard MIDI File and hands out the
//! raw span of each chunk, the header and track modules parse those spans

use header::HeaderChunk;
use tracing::debug;

use crate::{
    chunk::chunk_types::{HEADER_CHUNK, TRACK_DATA_CHUNK},
    error::{DecodeError, DecodeErrorKind, DecodeResult},
    reader::ByteReader,
    Chunk,
};

pub mod chunk_types;
pub mod header;
pub mod track;

/// Length of the chunk type plus length prefix
const CHUNK_PREFIX_LEN: usize = 8;

/// A chunk's descriptor paired with a reader over exactly its data
#[derive(Debug, Clone)]
pub struct RawChunk<'a> {
    /// Chunk type and declared length
    pub chunk: Chunk,
    /// Reader over the chunk's data, carrying absolute offsets
    pub data: ByteReader<'a>,
}

impl RawChunk<'_> {
    /// Returns true if this is an `MThd` chunk
    pub fn is_header(&self) -> bool {
        self.chunk.chunk_type == HEADER_CHUNK
    }

    /// Returns true if this is an `MTrk` chunk
    pub fn is_track(&self) -> bool {
        self.chunk.chunk_type == TRACK_DATA_CHUNK
    }
}

/// How a chunk whose declared length runs past the end of the input is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    /// A short chunk is an error
    Reject,
    /// A short final chunk is returned with whatever bytes remain
    Accept,
}

/// Walks the chunks of a Standard MIDI File
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    /// Reader over the whole file
    reader: ByteReader<'a>,
    /// Whether a header chunk has been read yet
    header_read: bool,
}

impl<'a> ChunkReader<'a> {
    /// Creates a chunk reader at the start of a file
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(bytes),
            header_read: false,
        }
    }

    /// Bytes left after the chunks read so far
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    /// Absolute offset of the next chunk
    pub fn offset(&self) -> usize {
        self.reader.offset()
    }

    /// Reads the `MThd` chunk, which must come first, and parses it
    pub fn read_header(&mut self) -> DecodeResult<HeaderChunk> {
        let raw = self
            .next_chunk(Truncation::Reject)?
            .ok_or_else(|| self.reader.error(DecodeErrorKind::TruncatedData))?;

        HeaderChunk::parse(raw)
    }

    /// Reads the next chunk. Returns `None` once the input is exhausted.
    ///
    /// The first chunk must be `MThd`. After it any chunk type is returned, it is up to the caller
    /// to skip the ones it does not know. See [`ChunkReader::next_track`].
    pub fn next_chunk(&mut self, truncation: Truncation) -> DecodeResult<Option<RawChunk<'a>>> {
        if self.reader.is_empty() {
            return Ok(None);
        }

        if self.reader.remaining() < CHUNK_PREFIX_LEN {
            return Err(self.reader.error(DecodeErrorKind::TruncatedChunk {
                declared: CHUNK_PREFIX_LEN as u32,
                available: self.reader.remaining(),
            }));
        }

        let start = self.reader.offset();
        let prefix = u64::from_be_bytes(self.reader.read_array()?);
        let chunk = Chunk::from(prefix);

        if !self.header_read {
            if chunk.chunk_type != HEADER_CHUNK {
                return Err(DecodeError::new(
                    start,
                    DecodeErrorKind::UnknownChunk(chunk.chunk_type),
                ));
            }
            self.header_read = true;
        }

        let data = if chunk.len() > self.reader.remaining() {
            match truncation {
                Truncation::Reject => {
                    return Err(self.reader.error(DecodeErrorKind::TruncatedChunk {
                        declared: chunk.length,
                        available: self.reader.remaining(),
                    }))
                }
                Truncation::Accept => {
                    let base = self.reader.offset();
                    ByteReader::with_base(self.reader.read_rest(), base)
                }
            }
        } else {
            self.reader.sub_reader(chunk.len())?
        };

        Ok(Some(RawChunk { chunk, data }))
    }

    /// Reads chunks until the next `MTrk`, skipping unknown chunk types
    pub fn next_track(&mut self, truncation: Truncation) -> DecodeResult<Option<RawChunk<'a>>> {
        while let Some(raw) = self.next_chunk(truncation)? {
            if raw.is_track() {
                return Ok(Some(raw));
            }

            debug!(
                chunk_type = ?raw.chunk.chunk_type,
                length = raw.chunk.len(),
                offset = raw.data.offset(),
                "Skipping unrecognized chunk"
            );
        }

        Ok(None)
    }
}
