//! Assembles Standard MIDI File bytes from events.
//!
//! A [`MidiBuilder`] always produces a fresh byte stream: every event is written with its own
//! status byte and each track is closed with an End of Track event. A decoded [`MidiFile`] can be
//! turned back into a builder to write it out again.
//!
//! A delta above [`MAX_VAR_LEN`] does not fit a variable-length quantity, so it is written as
//! empty `0xF7` escape packets spanning the excess followed by the event itself.

use crate::{
    chunk::{
        chunk_types::{HEADER_CHUNK, TRACK_DATA_CHUNK},
        header::{Division, Format, HeaderChunk},
        track::{meta::MetaEvent, sysex::SysexEvent, EventBody, Track},
    },
    midi::MidiFile,
    reader::MAX_VAR_LEN,
    writer::{to_midi_vlq, MidiWriteable},
    Chunk,
};

/// The events of one track as `(delta ticks, event)` pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackBuilder {
    /// Events in order
    events: Vec<(u32, EventBody)>,
}

impl TrackBuilder {
    /// Creates an empty track
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event `delta` ticks after the previous one
    pub fn event(mut self, delta: u32, body: EventBody) -> Self {
        self.push(delta, body);
        self
    }

    /// Appends an event in place
    pub fn push(&mut self, delta: u32, body: EventBody) {
        self.events.push((delta, body));
    }

    /// Number of events added so far
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events have been added
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl From<&Track> for TrackBuilder {
    fn from(track: &Track) -> Self {
        Self {
            events: track
                .iter()
                .map(|event| (event.delta, event.body.clone()))
                .collect(),
        }
    }
}

impl From<TrackBuilder> for (Chunk, Vec<u8>) {
    /// Encodes the track up to its first End of Track event, adding one if there is none
    fn from(value: TrackBuilder) -> Self {
        let mut bytes = vec![];
        let mut ended = false;

        for (mut delta, body) in value.events {
            ended = body.is_end_of_track();

            while delta > MAX_VAR_LEN {
                bytes.extend(to_midi_vlq(MAX_VAR_LEN));
                bytes.extend(SysexEvent::Escape(vec![]).to_midi_bytes());
                delta -= MAX_VAR_LEN;
            }

            bytes.extend(to_midi_vlq(delta));
            bytes.extend(body.to_midi_bytes());

            if ended {
                break;
            }
        }

        if !ended {
            bytes.extend(to_midi_vlq(0));
            bytes.extend(MetaEvent::EndOfTrack.to_midi_bytes());
        }

        let chunk = Chunk::new(TRACK_DATA_CHUNK, bytes.len() as u32);
        (chunk, bytes)
    }
}

/// Builds a complete Standard MIDI File
#[derive(Debug, Clone, PartialEq)]
pub struct MidiBuilder {
    /// File format written to the header
    format: Format,
    /// Tick division written to the header
    division: Division,
    /// Tracks in order
    tracks: Vec<TrackBuilder>,
}

impl MidiBuilder {
    /// Creates a builder with no tracks
    pub fn new(format: Format, division: Division) -> Self {
        Self {
            format,
            division,
            tracks: vec![],
        }
    }

    /// Appends a track
    pub fn track(mut self, track: TrackBuilder) -> Self {
        self.tracks.push(track);
        self
    }

    /// Encodes the header and every track. The header's track count is the number of tracks
    /// added
    pub fn build(self) -> Vec<u8> {
        let header = HeaderChunk::new(self.format, self.tracks.len() as u16, self.division);
        let data = header.to_midi_bytes();
        let chunk = Chunk::new(HEADER_CHUNK, data.len() as u32);

        let mut bytes = (chunk, data).to_midi_bytes();
        for track in self.tracks {
            let encoded: (Chunk, Vec<u8>) = track.into();
            bytes.extend(encoded.to_midi_bytes());
        }

        bytes
    }
}

impl From<&MidiFile> for MidiBuilder {
    fn from(midi: &MidiFile) -> Self {
        let header = midi.header();

        Self {
            format: header.format(),
            division: header.division(),
            tracks: midi.tracks().iter().map(TrackBuilder::from).collect(),
        }
    }
}
