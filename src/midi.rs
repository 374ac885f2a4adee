//! The decoded [`MidiFile`] and the functions that produce it.
//!
//! Decoding runs in two phases. Every `MTrk` chunk is first decoded on its own into a [`Track`] of
//! timed events, and only once all tracks are known are their Set Tempo events merged into the
//! tempo maps used to place events in seconds. Formats 0 and 1 share a single tempo map across
//! all tracks, format 2 tracks are independent sequences and each get their own.

use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    chunk::{
        header::HeaderChunk,
        track::{TimedEvent, Track},
        ChunkReader, Truncation,
    },
    error::{DecodeError, DecodeErrorKind, DecodeResult, Diagnostics, LoadError},
    reader::MidiReadable,
    tempo::TempoMap,
    timing::TimeResolver,
};

/// Options controlling how forgiving a decode is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodeOptions {
    /// When false, recoverable violations are recorded as warnings instead of failing the decode
    pub strict: bool,
}

impl DecodeOptions {
    /// Fails on any violation of the file format
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Recovers from trailing data, track count mismatches, a short final chunk, out of range
    /// data bytes and malformed meta payloads, recording each as a warning
    pub fn lenient() -> Self {
        Self { strict: false }
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::strict()
    }
}

/// A Set Tempo event and where it was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TempoEvent {
    /// Index of the track holding the event
    pub track: usize,
    /// Absolute tick of the event
    pub ticks: u64,
    /// The new tempo in microseconds per quarter note
    pub micros_per_beat: u32,
}

/// An event in the merged view of every track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedEvent<'a> {
    /// Index of the track the event came from
    pub track: usize,
    /// Seconds from the start of the file
    pub seconds: f64,
    /// The event
    pub event: &'a TimedEvent,
}

/// A fully decoded Standard MIDI File
#[derive(Debug, Clone, PartialEq)]
pub struct MidiFile {
    /// The `MThd` chunk
    header: HeaderChunk,
    /// Tracks in file order
    tracks: Vec<Track>,
    /// One resolver shared by every track, or one per track for format 2
    timelines: Vec<TimeResolver>,
    /// Violations tolerated by a lenient decode
    warnings: Vec<DecodeError>,
}

/// Decodes a Standard MIDI File, failing on any violation of the format
pub fn decode(bytes: &[u8]) -> DecodeResult<MidiFile> {
    decode_with(bytes, &DecodeOptions::default())
}

/// Decodes a Standard MIDI File with the given options
pub fn decode_with(bytes: &[u8], options: &DecodeOptions) -> DecodeResult<MidiFile> {
    let mut diagnostics = Diagnostics::new(options.strict);
    let mut chunks = ChunkReader::new(bytes);

    let header = chunks.read_header()?;

    let truncation = if options.strict {
        Truncation::Reject
    } else {
        Truncation::Accept
    };

    let mut tracks = vec![];
    loop {
        let raw = match chunks.next_track(truncation) {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(err) if matches!(err.kind(), DecodeErrorKind::TruncatedChunk { .. }) => {
                // Too few bytes left for another chunk prefix
                diagnostics.soft(err)?;
                break;
            }
            Err(err) => return Err(err),
        };

        if raw.chunk.len() > raw.data.remaining() {
            let err = DecodeError::new(
                raw.data.offset(),
                DecodeErrorKind::TruncatedChunk {
                    declared: raw.chunk.length,
                    available: raw.data.remaining(),
                },
            );
            diagnostics.soft(err.in_track(tracks.len()))?;
        }

        let track = Track::decode(raw.data, tracks.len(), &mut diagnostics)?;
        tracks.push(track);
    }

    if usize::from(header.ntrks()) != tracks.len() {
        let err = DecodeError::new(
            chunks.offset(),
            DecodeErrorKind::InconsistentTrackCount {
                declared: header.ntrks(),
                found: tracks.len(),
            },
        );
        // Format 2 tracks do not share a clock
        if header.format().is_synchronous() {
            diagnostics.soft(err)?;
        } else {
            diagnostics.warn(err);
        }
    }

    let timelines = if header.format().is_synchronous() {
        vec![TimeResolver::new(
            TempoMap::from_tracks(&tracks),
            header.division(),
        )]
    } else {
        tracks
            .iter()
            .map(|track| TimeResolver::new(TempoMap::from_tracks([track]), header.division()))
            .collect()
    };

    let warnings = diagnostics.into_warnings();

    debug!(
        format = ?header.format(),
        tracks = tracks.len(),
        warnings = warnings.len(),
        "Decoded MIDI file"
    );

    Ok(MidiFile {
        header,
        tracks,
        timelines,
        warnings,
    })
}

impl MidiFile {
    /// Reads and strictly decodes the file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let bytes = path.get_midi_bytes()?;
        Ok(decode(&bytes)?)
    }

    /// The header chunk
    pub fn header(&self) -> &HeaderChunk {
        &self.header
    }

    /// All tracks in file order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// The track at `index`
    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Warnings recorded by a lenient decode. Always empty after a strict decode unless a track
    /// was missing its End of Track or left a System Exclusive message open
    pub fn warnings(&self) -> &[DecodeError] {
        &self.warnings
    }

    /// Every Set Tempo event, track by track
    pub fn tempo_events(&self) -> impl Iterator<Item = TempoEvent> + '_ {
        self.tracks.iter().enumerate().flat_map(|(track, events)| {
            events
                .tempo_changes()
                .map(move |(ticks, micros_per_beat)| TempoEvent {
                    track,
                    ticks,
                    micros_per_beat,
                })
        })
    }

    /// Resolver used for the track at `index`
    fn timeline(&self, index: usize) -> Option<&TimeResolver> {
        if index >= self.tracks.len() {
            return None;
        }

        if self.header.format().is_synchronous() {
            self.timelines.first()
        } else {
            self.timelines.get(index)
        }
    }

    /// The tempo map governing the track at `index`. Tracks of format 0 and 1 files all share
    /// one map
    pub fn tempo_map(&self, index: usize) -> Option<&TempoMap> {
        self.timeline(index).map(TimeResolver::tempo_map)
    }

    /// Seconds from the start of the track at `index` to `tick`
    pub fn tick_to_seconds(&self, index: usize, tick: u64) -> Option<f64> {
        self.timeline(index).map(|timeline| timeline.seconds(tick))
    }

    /// The events of the track at `index`, each paired with its time in seconds
    pub fn timed_events(
        &self,
        index: usize,
    ) -> Option<impl Iterator<Item = (f64, &TimedEvent)> + '_> {
        let timeline = self.timeline(index)?;
        let track = &self.tracks[index];

        Some(
            track
                .iter()
                .map(move |event| (timeline.seconds(event.ticks), event)),
        )
    }

    /// Events of every track in one sequence ordered by absolute tick. Events at the same tick
    /// keep track order, then file order. `None` for format 2, whose tracks do not share a clock
    pub fn merged_events(&self) -> Option<Vec<MergedEvent<'_>>> {
        let timeline = self.timelines.first()?;
        if !self.header.format().is_synchronous() {
            return None;
        }

        let mut merged: Vec<_> = self
            .tracks
            .iter()
            .enumerate()
            .flat_map(|(track, events)| {
                events.iter().map(move |event| MergedEvent {
                    track,
                    seconds: timeline.seconds(event.ticks),
                    event,
                })
            })
            .collect();

        merged.sort_by_key(|merged| merged.event.ticks);

        Some(merged)
    }

    /// Seconds until the last event of the longest track. `None` for format 2
    pub fn duration(&self) -> Option<f64> {
        if !self.header.format().is_synchronous() {
            return None;
        }

        let end = self.tracks.iter().map(Track::end_ticks).max().unwrap_or(0);
        self.timelines.first().map(|timeline| timeline.seconds(end))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{decode, decode_with, DecodeOptions, MidiFile, TempoEvent};
    use crate::{
        chunk::{header::Format, track::EventBody},
        error::DecodeErrorKind,
        tempo::{TempoBreakpoint, DEFAULT_TEMPO},
    };

    /// Tempo track: 120 BPM at tick 0, 240 BPM at tick 960
    const TEMPO_TRACK: &[u8] = &[
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
        0x87, 0x40, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90, // +960, tempo 250000
        0x00, 0xFF, 0x2F, 0x00,
    ];

    /// One note from tick 0 to tick 1920
    const NOTE_TRACK: &[u8] = &[
        0x00, 0x90, 0x3C, 0x64, // note on
        0x8F, 0x00, 0x80, 0x3C, 0x00, // +1920, note off
        0x00, 0xFF, 0x2F, 0x00,
    ];

    /// Assembles a file at 480 ticks per quarter note
    fn file(format: u16, ntrks: u16, tracks: &[&[u8]]) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend(6u32.to_be_bytes());
        bytes.extend(format.to_be_bytes());
        bytes.extend(ntrks.to_be_bytes());
        bytes.extend(480u16.to_be_bytes());

        for track in tracks {
            bytes.extend(b"MTrk");
            bytes.extend((track.len() as u32).to_be_bytes());
            bytes.extend(*track);
        }

        bytes
    }

    #[test]
    fn tempo_map_is_shared_across_format_1_tracks() {
        let midi = decode(&file(1, 2, &[TEMPO_TRACK, NOTE_TRACK])).expect("Decode file");

        assert_eq!(midi.header().format(), Format::One);
        assert_eq!(midi.tracks().len(), 2);
        assert!(midi.warnings().is_empty());

        assert_eq!(midi.tick_to_seconds(1, 960), Some(1.0));
        assert_eq!(midi.tick_to_seconds(1, 1920), Some(1.5));
        assert_eq!(midi.tempo_map(0), midi.tempo_map(1));
        assert_eq!(midi.duration(), Some(1.5));
    }

    #[test]
    fn tempo_events_name_their_track() {
        let midi = decode(&file(1, 2, &[NOTE_TRACK, TEMPO_TRACK])).expect("Decode file");
        let events: Vec<_> = midi.tempo_events().collect();

        assert_eq!(
            events,
            vec![
                TempoEvent {
                    track: 1,
                    ticks: 0,
                    micros_per_beat: 500_000
                },
                TempoEvent {
                    track: 1,
                    ticks: 960,
                    micros_per_beat: 250_000
                },
            ]
        );
    }

    #[test]
    fn format_2_tracks_keep_their_own_tempo() {
        let midi = decode(&file(2, 2, &[TEMPO_TRACK, NOTE_TRACK])).expect("Decode file");

        assert_eq!(
            midi.tempo_map(1).map(|map| map.breakpoints().to_vec()),
            Some(vec![TempoBreakpoint {
                ticks: 0,
                micros_per_beat: DEFAULT_TEMPO
            }])
        );
        assert_eq!(midi.tick_to_seconds(0, 1920), Some(1.5));
        assert_eq!(midi.tick_to_seconds(1, 1920), Some(2.0));

        assert_eq!(midi.duration(), None);
        assert!(midi.merged_events().is_none());
    }

    #[test]
    fn timed_events_pair_seconds_with_events() {
        let midi = decode(&file(1, 2, &[TEMPO_TRACK, NOTE_TRACK])).expect("Decode file");
        let seconds: Vec<_> = midi
            .timed_events(1)
            .expect("Track exists")
            .map(|(seconds, _)| seconds)
            .collect();

        assert_eq!(seconds, vec![0.0, 1.5, 1.5]);
        assert!(midi.timed_events(2).is_none());
        assert_eq!(midi.tick_to_seconds(2, 0), None);
    }

    #[test]
    fn merged_events_order_by_tick_then_track() {
        let midi = decode(&file(1, 2, &[TEMPO_TRACK, NOTE_TRACK])).expect("Decode file");
        let merged = midi.merged_events().expect("Format 1 merges");

        let order: Vec<_> = merged
            .iter()
            .map(|merged| (merged.event.ticks, merged.track))
            .collect();
        assert_eq!(
            order,
            vec![(0, 0), (0, 1), (960, 0), (960, 0), (1920, 1), (1920, 1)]
        );

        let note_off = &merged[4];
        assert!(matches!(note_off.event.body, EventBody::ChannelVoice(_)));
        assert_eq!(note_off.seconds, 1.5);
    }

    #[test]
    fn later_track_wins_tempo_at_shared_tick() {
        let first: &[u8] = &[
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
            0x83, 0x60, 0xFF, 0x51, 0x03, 0x06, 0x1A, 0x80, // +480, tempo 400000
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let second: &[u8] = &[
            0x83, 0x60, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90, // +480, tempo 250000
            0x00, 0xFF, 0x2F, 0x00,
        ];

        let midi = decode(&file(1, 2, &[first, second])).expect("Decode file");
        let map = midi.tempo_map(0).expect("Track exists");

        assert_eq!(
            map.breakpoints().to_vec(),
            vec![
                TempoBreakpoint {
                    ticks: 0,
                    micros_per_beat: 500_000
                },
                TempoBreakpoint {
                    ticks: 480,
                    micros_per_beat: 250_000
                },
            ]
        );
        assert_eq!(map.tempo_at(480), 250_000);
        assert_eq!(midi.tick_to_seconds(0, 960), Some(0.75));
        assert_eq!(midi.tempo_map(1), Some(map));
    }

    #[test]
    fn track_count_mismatch_depends_on_mode() {
        let bytes = file(1, 3, &[TEMPO_TRACK, NOTE_TRACK]);

        let err = decode(&bytes).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::InconsistentTrackCount {
                declared: 3,
                found: 2
            }
        );
        assert_eq!(err.offset(), bytes.len());

        let midi = decode_with(&bytes, &DecodeOptions::lenient()).expect("Lenient decode");
        assert_eq!(midi.tracks().len(), 2);
        assert_eq!(midi.warnings().len(), 1);
    }

    #[test]
    fn format_2_track_count_mismatch_is_a_warning() {
        let midi = decode(&file(2, 3, &[TEMPO_TRACK])).expect("Decode file");

        assert_eq!(midi.tracks().len(), 1);
        assert_eq!(
            midi.warnings()[0].kind(),
            &DecodeErrorKind::InconsistentTrackCount {
                declared: 3,
                found: 1
            }
        );
    }

    #[test]
    fn lenient_decode_tolerates_short_tail() {
        let mut bytes = file(0, 1, &[NOTE_TRACK]);
        bytes.extend([0x00, 0x01]);

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::TruncatedChunk { .. }));

        let midi = decode_with(&bytes, &DecodeOptions::lenient()).expect("Lenient decode");
        assert_eq!(midi.tracks().len(), 1);
        assert!(matches!(
            midi.warnings()[0].kind(),
            DecodeErrorKind::TruncatedChunk { .. }
        ));
    }

    #[test]
    fn lenient_decode_uses_short_final_chunk() {
        let mut bytes = file(0, 1, &[NOTE_TRACK]);
        // Declare two more bytes than the track holds
        let len_at = 14 + 4;
        bytes[len_at + 3] += 2;

        assert!(decode(&bytes).is_err());

        let midi = decode_with(&bytes, &DecodeOptions::lenient()).expect("Lenient decode");
        assert_eq!(midi.track(0).map(|track| track.len()), Some(3));
        assert_eq!(midi.warnings().len(), 1);
        assert_eq!(midi.warnings()[0].track(), Some(0));
    }

    #[test]
    fn decoded_file_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MidiFile>();

        assert_eq!(DecodeOptions::default(), DecodeOptions::strict());
    }
}
