//! Header Chunk Enum and Struct Definitions

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    chunk::RawChunk,
    error::{DecodeError, DecodeErrorKind, DecodeResult},
};

/// Minimum data length of an `MThd` chunk
const HEADER_LEN: usize = 6;

/// Header chunk data, including format, ntrks and division as 3 16 bit unsigned integers
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeaderChunk {
    /// The MIDI format
    format: Format,
    /// Number of tracks
    ntrks: u16,
    /// Time signature/division
    division: Division,
}

impl HeaderChunk {
    /// Creates a header chunk
    pub fn new(format: Format, ntrks: u16, division: Division) -> Self {
        Self {
            format,
            ntrks,
            division,
        }
    }

    /// Parses the data of an `MThd` chunk. Bytes past the first six are ignored
    pub fn parse(mut raw: RawChunk<'_>) -> DecodeResult<Self> {
        let start = raw.data.offset();
        let malformed = |reason| DecodeError::new(start, DecodeErrorKind::MalformedHeader(reason));

        if raw.data.remaining() < HEADER_LEN {
            return Err(malformed("header chunk shorter than 6 bytes"));
        }

        let format = raw.data.read_u16_be()?;
        let ntrks = raw.data.read_u16_be()?;
        let division = raw.data.read_u16_be()?;

        let header = Self::try_from((format, ntrks, division))
            .map_err(|_| malformed("format must be 0, 1 or 2"))?;

        match header.division {
            Division::Metrical(0) => Err(malformed("zero ticks per quarter note")),
            Division::TimeCodeBased(smpte) if smpte.fps().is_none() => {
                Err(malformed("unsupported SMPTE frame rate"))
            }
            Division::TimeCodeBased(smpte) if smpte.tpf == 0 => {
                Err(malformed("zero ticks per frame"))
            }
            _ => Ok(header),
        }
    }

    /// The file's format
    pub fn format(&self) -> Format {
        self.format
    }

    /// Number of tracks the header declares
    pub fn ntrks(&self) -> u16 {
        self.ntrks
    }

    /// How delta ticks map to time
    pub fn division(&self) -> Division {
        self.division
    }

    /// Ticks per quarter note, if the division is metrical
    pub fn ticks_per_beat(&self) -> Option<u16> {
        match self.division {
            Division::Metrical(tpq) => Some(tpq),
            Division::TimeCodeBased(_) => None,
        }
    }
}

impl TryFrom<(u16, u16, u16)> for HeaderChunk {
    type Error = InvalidFormat;
    fn try_from(value: (u16, u16, u16)) -> Result<Self, Self::Error> {
        let (format, ntrks, division) = value;

        Ok(Self {
            format: format.try_into()?,
            ntrks,
            division: division.into(),
        })
    }
}

/// The overall organization of the MIDI file. Only three values are valid, making most of the 16
/// bits irrelevant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Format {
    /// The file contains a single multi-channel track
    Zero,
    /// The file contains one or more simultaneous tracks (or MIDI outputs) of a sequence
    One,
    /// The file contains one or more sequentially independent single-track patterns
    Two,
}

impl Format {
    /// True when all tracks share one tick clock and one tempo map
    pub fn is_synchronous(&self) -> bool {
        !matches!(self, Format::Two)
    }
}

impl From<Format> for u16 {
    fn from(value: Format) -> Self {
        match value {
            Format::Zero => 0,
            Format::One => 1,
            Format::Two => 2,
        }
    }
}

/// Error struct representing an invalid format specifier
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid header format")]
pub struct InvalidFormat;

impl TryFrom<u16> for Format {
    type Error = InvalidFormat;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Format::Zero),
            1 => Ok(Format::One),
            2 => Ok(Format::Two),
            _ => Err(InvalidFormat),
        }
    }
}

/// The meaning of the delta-times in the MIDI sequence,
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Division {
    /// When bit 15 is a 0, bits 14-0 represent ticks per quarter note
    Metrical(u16),
    /// When bit 15 is 1, bits 14-8 represent the negative SMPTE format,
    /// and bits 7-0 represent ticks per frame
    TimeCodeBased(SmpteTicks),
}

/// Division defined by time-code-based time
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmpteTicks {
    /// Negative frame rate: -24, -25, -29 or -30
    smpte: i8,
    /// 8 bits of ticks per frame
    tpf: u8,
}

impl SmpteTicks {
    /// Creates a time-code division from a positive frame rate and ticks per frame
    pub fn new(fps: u8, tpf: u8) -> Self {
        Self {
            smpte: (fps as i8).wrapping_neg(),
            tpf,
        }
    }

    /// Frames per second as a real number, `None` for rates the format does not define.
    /// The value 29 stands for 29.97 drop-frame
    pub fn fps(&self) -> Option<f64> {
        match self.smpte {
            -24 => Some(24.0),
            -25 => Some(25.0),
            -29 => Some(30_000.0 / 1001.0),
            -30 => Some(30.0),
            _ => None,
        }
    }

    /// Ticks per frame
    pub fn ticks_per_frame(&self) -> u8 {
        self.tpf
    }

    /// Raw negative frame rate as stored in the header
    pub fn smpte(&self) -> i8 {
        self.smpte
    }
}

impl From<u16> for Division {
    fn from(value: u16) -> Self {
        const MASK: u16 = 0x7FFF;
        let msb = value >> 15;
        let remaining = value & MASK;

        match msb {
            0 => Division::Metrical(remaining),
            _ => {
                // The whole high byte is the two's complement frame rate
                let [smpte, tpf] = value.to_be_bytes();

                Division::TimeCodeBased(SmpteTicks {
                    smpte: smpte as i8,
                    tpf,
                })
            }
        }
    }
}

impl From<Division> for u16 {
    fn from(value: Division) -> Self {
        match value {
            Division::Metrical(tpq) => tpq & 0x7FFF,
            Division::TimeCodeBased(SmpteTicks { smpte, tpf }) => {
                u16::from_be_bytes([smpte as u8 | 0x80, tpf])
            }
        }
    }
}
