//! Decode errors and warnings

use thiserror::Error;
use tracing::warn;

/// An error raised while decoding a MIDI byte stream. Carries the absolute byte offset into the
/// input where the problem was found and, when it happened inside a track, that track's index.
///
/// Lenient decoding reuses this type for the warnings it collects instead of failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at byte {offset}{}", track_context(.track))]
pub struct DecodeError {
    /// Absolute byte offset of the failure
    offset: usize,
    /// Index of the track being decoded, if any
    track: Option<usize>,
    /// What went wrong
    kind: DecodeErrorKind,
}

/// Formats the optional track index for display
fn track_context(track: &Option<usize>) -> String {
    track.map(|idx| format!(" in track {idx}")).unwrap_or_default()
}

/// The kinds of failure a decode can produce
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A read ran past the end of the available bytes
    #[error("Unexpected end of data")]
    TruncatedData,
    /// A chunk declared more bytes than the input holds
    #[error("Chunk declares {declared} bytes but only {available} remain")]
    TruncatedChunk {
        /// Length declared by the chunk
        declared: u32,
        /// Bytes actually left in the input
        available: usize,
    },
    /// The `MThd` chunk is too short or holds invalid values
    #[error("Malformed header: {0}")]
    MalformedHeader(&'static str),
    /// The first chunk is not `MThd`
    #[error("Expected MThd chunk, found {0:?}")]
    UnknownChunk([char; 4]),
    /// A data byte appeared before any channel status byte
    #[error("Data byte without an established running status")]
    MissingRunningStatus,
    /// Status byte that no Standard MIDI File event starts with
    #[error("Unknown event type 0x{0:02X}")]
    UnknownEventType(u8),
    /// Bytes remain in a track after its End of Track event
    #[error("{0} bytes after End of Track")]
    UnexpectedTrailingData(usize),
    /// Declared track count does not match the number of `MTrk` chunks
    #[error("Header declares {declared} tracks but {found} were found")]
    InconsistentTrackCount {
        /// Count from the header
        declared: u16,
        /// Count of track chunks parsed
        found: usize,
    },
    /// Variable-length quantity longer than 4 bytes, so above the 28 bit limit
    #[error("Variable-length quantity longer than 4 bytes")]
    VarLenOverflow,
    /// Channel message data byte with its high bit set
    #[error("Invalid data byte 0x{0:02X}")]
    InvalidDataByte(u8),
    /// Meta event whose payload does not fit its type
    #[error("Meta event 0x{tag:02X} has an invalid payload of {len} bytes")]
    InvalidMetaEvent {
        /// Meta type byte
        tag: u8,
        /// Payload length found
        len: usize,
    },
    /// A track ended without an End of Track meta event
    #[error("Track has no End of Track event")]
    MissingEndOfTrack,
    /// A System Exclusive message was never terminated with 0xF7
    #[error("Unterminated System Exclusive message")]
    UnterminatedSysex,
}

impl DecodeError {
    /// Creates an error at an absolute byte offset
    pub fn new(offset: usize, kind: DecodeErrorKind) -> Self {
        Self {
            offset,
            track: None,
            kind,
        }
    }

    /// Attaches a track index, keeping any index already present
    pub fn in_track(mut self, track: usize) -> Self {
        self.track.get_or_insert(track);
        self
    }

    /// Absolute byte offset where the error occurred
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Track index the error occurred in
    pub fn track(&self) -> Option<usize> {
        self.track
    }

    /// The kind of error
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }
}

/// Error returned when loading a MIDI file from a readable source
#[derive(Error, Debug)]
pub enum LoadError {
    /// Reading the source failed
    #[error("Failed to read MIDI source")]
    Io(#[from] std::io::Error),
    /// The bytes were read but could not be decoded
    #[error("Failed to decode MIDI data")]
    Decode(#[from] DecodeError),
}

/// The Decode Result type (see [`DecodeError`])
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Collects warnings during a decode. In strict mode soft violations are escalated to errors
#[derive(Debug)]
pub(crate) struct Diagnostics {
    /// Whether soft violations abort the decode
    strict: bool,
    /// Warnings recorded so far
    warnings: Vec<DecodeError>,
}

impl Diagnostics {
    /// Creates an empty collector
    pub(crate) fn new(strict: bool) -> Self {
        Self {
            strict,
            warnings: vec![],
        }
    }

    /// A violation that strict mode rejects and lenient mode records
    pub(crate) fn soft(&mut self, err: DecodeError) -> DecodeResult<()> {
        if self.strict {
            Err(err)
        } else {
            self.warn(err);
            Ok(())
        }
    }

    /// Records a warning in either mode
    pub(crate) fn warn(&mut self, err: DecodeError) {
        warn!(offset = err.offset, track = ?err.track, "{}", err.kind);
        self.warnings.push(err);
    }

    /// Takes the recorded warnings
    pub(crate) fn into_warnings(self) -> Vec<DecodeError> {
        self.warnings
    }
}
