//! Byte level reading. [`ByteReader`] is a bounds-checked cursor over an in-memory span, and
//! [`MidiReadable`] loads the bytes of a MIDI source (a file path or an owned buffer)

use std::{convert::Infallible, fs, path::Path};

use crate::error::{DecodeError, DecodeErrorKind, DecodeResult};

/// Largest value a 4 byte variable-length quantity can hold
pub const MAX_VAR_LEN: u32 = 0x0FFF_FFFF;

/// A cursor over a borrowed byte span. Every read is checked against the end of the span and a
/// failed read leaves the position untouched.
///
/// The reader remembers the absolute offset of its span inside the whole input, so errors point
/// into the original file even when reading a single chunk.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    /// Bytes being read
    data: &'a [u8],
    /// Current position within `data`
    position: usize,
    /// Absolute offset of `data[0]` in the original input
    base: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader starting at the beginning of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Creates a reader over a span that starts at `base` in the original input
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            position: 0,
            base,
        }
    }

    /// Position relative to the start of this span
    pub fn position(&self) -> usize {
        self.position
    }

    /// Absolute offset into the original input
    pub fn offset(&self) -> usize {
        self.base + self.position
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns true once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Builds an error at the current offset
    pub fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(self.offset(), kind)
    }

    /// Returns the next byte without consuming it
    pub fn peek_u8(&self) -> DecodeResult<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or_else(|| self.error(DecodeErrorKind::TruncatedData))
    }

    /// Reads a run of `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.error(DecodeErrorKind::TruncatedData));
        }

        let data = self.data;
        let bytes = &data[self.position..self.position + n];
        self.position += n;

        Ok(bytes)
    }

    /// Reads exactly `N` bytes into an array
    pub fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    /// Reads a single byte
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        let [byte] = self.read_array()?;
        Ok(byte)
    }

    /// Reads a big-endian 16 bit unsigned integer
    pub fn read_u16_be(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian 24 bit unsigned integer
    pub fn read_u24_be(&mut self) -> DecodeResult<u32> {
        let [a, b, c] = self.read_array()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    /// Reads a big-endian 32 bit unsigned integer
    pub fn read_u32_be(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads a MIDI variable-length quantity: 7 bits per byte, most significant group first, with
    /// the high bit of each byte flagging that another byte follows. At most 4 bytes are allowed.
    pub fn read_var_len(&mut self) -> DecodeResult<u32> {
        const MASK: u8 = 0x7F;
        const MAX_LEN: usize = 4;

        let data = self.data;
        let mut result: u32 = 0;
        for (idx, byte) in data[self.position..].iter().enumerate() {
            if idx == MAX_LEN {
                return Err(self.error(DecodeErrorKind::VarLenOverflow));
            }

            result = (result << 7) | (byte & MASK) as u32;

            if byte & 0x80 == 0 {
                self.position += idx + 1;
                return Ok(result);
            }
        }

        Err(self.error(DecodeErrorKind::TruncatedData))
    }

    /// Splits off a sub-reader over the next `n` bytes and advances past them
    pub fn sub_reader(&mut self, n: usize) -> DecodeResult<ByteReader<'a>> {
        let base = self.offset();
        let bytes = self.read_bytes(n)?;
        Ok(ByteReader::with_base(bytes, base))
    }

    /// Consumes and returns everything left
    pub fn read_rest(&mut self) -> &'a [u8] {
        let data = self.data;
        let rest = &data[self.position..];
        self.position = data.len();
        rest
    }
}

/// Trait that allows for different types to be translated to a MIDI parseable format
pub trait MidiReadable {
    /// Error type that may be returned while loading the bytes
    type Error;
    /// Loads the complete byte contents of the source
    fn get_midi_bytes(self) -> Result<Vec<u8>, Self::Error>;
}

/// Wrapper struct to allow passing `Vec<u8>` to the [`MidiReadable`] trait
pub struct MidiData(pub Vec<u8>);

impl MidiReadable for MidiData {
    type Error = Infallible;
    fn get_midi_bytes(self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.0)
    }
}

impl<PATH> MidiReadable for PATH
where
    PATH: AsRef<Path>,
{
    type Error = std::io::Error;
    fn get_midi_bytes(self) -> Result<Vec<u8>, Self::Error> {
        fs::read(self.as_ref())
    }
}
