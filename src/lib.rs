//! # midtime
//!
//! A Standard MIDI File decoder that resolves every event to absolute time. Files are decoded in
//! two phases: each track is decoded on its own into timed events, then the tempo changes found
//! across the tracks are merged into a tempo map used to convert ticks into seconds.
//!
//! ## Overview
//!
//! MIDI files are structured as a series of chunks. Each chunk contains a 4-character ASCII
//! type identifier and a 32-bit length that specifies how many bytes of data follow. The first
//! chunk is always the `MThd` header, followed by one `MTrk` chunk per track. Track data is a
//! stream of delta-timed events, where deltas are counted in ticks. What a tick means in real
//! time depends on the header's division and on any tempo changes seen so far.
//!
//! - **Strict or lenient**: malformed files fail with a typed [`error::DecodeError`] carrying the
//!   byte offset and track index, or with [`DecodeOptions::lenient`] soft violations are
//!   collected as warnings next to a best-effort result.
//! - **Tempo aware**: [`MidiFile::tick_to_seconds`] integrates across every tempo change instead
//!   of applying the latest tempo to the whole tick count.
//!
//! ## Example Usage
//!
//! ```rust
//! use midtime::{
//!     builder::{MidiBuilder, TrackBuilder},
//!     chunk::{
//!         header::{Division, Format},
//!         track::{event::ChannelVoice, meta::MetaEvent, EventBody},
//!     },
//! };
//!
//! let bytes = MidiBuilder::new(Format::Zero, Division::Metrical(480))
//!     .track(
//!         TrackBuilder::new()
//!             .event(0, EventBody::Meta(MetaEvent::SetTempo(500_000)))
//!             .event(0, EventBody::ChannelVoice(ChannelVoice::note_on(0, 60, 100)))
//!             .event(960, EventBody::ChannelVoice(ChannelVoice::note_off(0, 60, 0))),
//!     )
//!     .build();
//!
//! let midi = midtime::decode(&bytes).expect("Decode built file");
//! for (seconds, event) in midi.timed_events(0).expect("Track 0 exists") {
//!     println!("{seconds:.3}s {:?}", event.body);
//! }
//! assert_eq!(midi.tick_to_seconds(0, 960), Some(1.0));
//! ```
//!
//! ## Library Structure
//!
//! - **[`reader`]**: the bounds-checked [`reader::ByteReader`] and the [`reader::MidiReadable`]
//!   trait for loading bytes from files.
//! - **[`chunk`]**: chunk framing, the header chunk and the track event decoder.
//! - **[`tempo`]** and **[`timing`]**: the tempo map and tick to seconds conversion.
//! - **[`midi`]**: the decoded [`MidiFile`] and its query API.
//! - **[`writer`]** and **[`builder`]**: encoding back into Standard MIDI File bytes.

pub mod builder;
pub mod chunk;
pub mod error;
pub mod midi;
pub mod reader;
pub mod tempo;
pub mod timing;
pub mod writer;

pub use midi::{decode, decode_with, DecodeOptions, MidiFile};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a raw MIDI Chunk.
/// A MIDI Chunk consists of a 4-character ASCII type identifier and a 32-bit unsigned integer specifying the length of its data.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Chunk {
    /// 4 character ASCII chunk type
    pub chunk_type: [char; 4],
    /// Length of the data that follows
    length: u32,
}

impl Chunk {
    /// Creates a chunk descriptor from its type and data length
    pub fn new(chunk_type: [char; 4], length: u32) -> Self {
        Self { chunk_type, length }
    }

    /// Gets the length of the chunk as a usize
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Returns if the chunk has no attributed data
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl From<u64> for Chunk {
    fn from(value: u64) -> Self {
        let high = (value >> 32) as u32;
        let low = value as u32;

        let a = (high >> 24) as u8 as char;
        let b = (high >> 16) as u8 as char;
        let c = (high >> 8) as u8 as char;
        let d = high as u8 as char;

        Self {
            chunk_type: [a, b, c, d],
            length: low,
        }
    }
}
