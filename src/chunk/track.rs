//! Track chunk decoding. Turns the bytes of one `MTrk` chunk into a sequence of timed events,
//! tracking running status and open System Exclusive messages along the way

use event::{ChannelVoice, VoiceKind};
use meta::MetaEvent;
use sysex::{SysexEvent, SYSEX_END, SYSEX_START};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{DecodeError, DecodeErrorKind, DecodeResult, Diagnostics},
    reader::{ByteReader, MAX_VAR_LEN},
    writer::{to_midi_vlq, MidiWriteable},
};

pub mod event;
pub mod meta;
pub mod sysex;

/// Any event that may occur in a track
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventBody {
    /// A channel voice message
    ChannelVoice(ChannelVoice),
    /// Specifies non-MIDI information useful to this format or to sequencers
    Meta(MetaEvent),
    /// A system exclusive event
    SysEx(SysexEvent),
}

impl EventBody {
    /// Returns the tempo if this is a Set Tempo meta event
    pub fn tempo(&self) -> Option<u32> {
        match self {
            Self::Meta(MetaEvent::SetTempo(tempo)) => Some(*tempo),
            _ => None,
        }
    }

    /// Returns true for the End of Track meta event
    pub fn is_end_of_track(&self) -> bool {
        matches!(self, Self::Meta(MetaEvent::EndOfTrack))
    }
}

impl MidiWriteable for EventBody {
    fn to_midi_bytes(self) -> Vec<u8> {
        match self {
            Self::ChannelVoice(event) => event.to_midi_bytes(),
            Self::Meta(event) => event.to_midi_bytes(),
            Self::SysEx(event) => event.to_midi_bytes(),
        }
    }
}

/// An event with its position in the track
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimedEvent {
    /// Ticks since the previous event in the same track
    pub delta: u32,
    /// Ticks since the start of the track
    pub ticks: u64,
    /// The event itself
    pub body: EventBody,
}

impl MidiWriteable for TimedEvent {
    fn to_midi_bytes(self) -> Vec<u8> {
        let mut bytes = to_midi_vlq(self.delta);
        bytes.extend(self.body.to_midi_bytes());

        bytes
    }
}

/// A decoded track, containing its events in file order
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// All events of the track
    events: Vec<TimedEvent>,
}

impl Track {
    /// The track's events
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    /// Iterates over the track's events
    pub fn iter(&self) -> std::slice::Iter<'_, TimedEvent> {
        self.events.iter()
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the track holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Absolute tick of the last event
    pub fn end_ticks(&self) -> u64 {
        self.events.last().map_or(0, |event| event.ticks)
    }

    /// Text of the first Track Name meta event
    pub fn name(&self) -> Option<String> {
        self.events.iter().find_map(|event| match &event.body {
            EventBody::Meta(meta @ MetaEvent::TrackName(_)) => {
                meta.text().map(|text| text.into_owned())
            }
            _ => None,
        })
    }

    /// Set Tempo events as `(absolute tick, microseconds per beat)`
    pub fn tempo_changes(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.events
            .iter()
            .filter_map(|event| event.body.tempo().map(|tempo| (event.ticks, tempo)))
    }

    /// Decodes the data of an `MTrk` chunk. Errors and warnings carry `index` as their track
    pub(crate) fn decode(
        data: ByteReader<'_>,
        index: usize,
        diagnostics: &mut Diagnostics,
    ) -> DecodeResult<Self> {
        let mut decoder = TrackDecoder {
            reader: data,
            index,
            diagnostics,
            state: DecoderState::default(),
            events: vec![],
        };

        decoder.run().map_err(|err| err.in_track(index))?;

        debug!(
            track = index,
            events = decoder.events.len(),
            "Decoded track"
        );

        Ok(Self {
            events: decoder.events,
        })
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a TimedEvent;
    type IntoIter = std::slice::Iter<'a, TimedEvent>;
    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl From<Vec<TimedEvent>> for Track {
    fn from(events: Vec<TimedEvent>) -> Self {
        Self { events }
    }
}

/// The mutable state of a track scan
#[derive(Debug, Clone, Copy, Default)]
struct DecoderState {
    /// Last channel voice status byte, reused by events that omit theirs
    running_status: Option<u8>,
    /// Index of a System Exclusive message still waiting for continuation packets
    open_sysex: Option<usize>,
    /// Delta ticks of absorbed continuation packets, added to the next emitted event. Never
    /// above `MAX_VAR_LEN`
    carry: u32,
    /// Absolute tick of the last byte read
    ticks: u64,
}

/// What decoding one event produced
enum Decoded {
    /// A new event for the track
    Event(EventBody),
    /// A continuation packet merged into an earlier System Exclusive message
    Continuation,
}

/// Decodes the events of a single track
struct TrackDecoder<'a, 'd> {
    /// Reader over the chunk data
    reader: ByteReader<'a>,
    /// Index of the track
    index: usize,
    /// Where warnings go
    diagnostics: &'d mut Diagnostics,
    /// Scan state
    state: DecoderState,
    /// Events decoded so far
    events: Vec<TimedEvent>,
}

impl<'a> TrackDecoder<'a, '_> {
    /// Decodes events until End of Track or the end of the chunk
    fn run(&mut self) -> DecodeResult<()> {
        let mut ended = false;

        while !self.reader.is_empty() {
            let delta = self.reader.read_var_len()?;
            self.state.ticks += delta as u64;

            match self.next_body()? {
                Decoded::Event(body) => {
                    let delta = self.fold_carry(delta);
                    let end = body.is_end_of_track();
                    if let EventBody::SysEx(sysex @ SysexEvent::Message { .. }) = &body {
                        // A new message ends any message still open
                        self.close_open_sysex();
                        if sysex.is_open() {
                            self.state.open_sysex = Some(self.events.len());
                        }
                    }

                    self.events.push(TimedEvent {
                        delta,
                        ticks: self.state.ticks,
                        body,
                    });

                    if end {
                        ended = true;
                        break;
                    }
                }
                Decoded::Continuation => {
                    self.state.carry = self.fold_carry(delta);
                }
            }
        }

        self.close_open_sysex();

        if ended {
            if !self.reader.is_empty() {
                let trailing = self.reader.remaining();
                let err = self
                    .reader
                    .error(DecodeErrorKind::UnexpectedTrailingData(trailing));
                self.diagnostics.soft(err.in_track(self.index))?;
            }
        } else {
            let err = self.reader.error(DecodeErrorKind::MissingEndOfTrack);
            self.diagnostics.warn(err.in_track(self.index));
        }

        Ok(())
    }

    /// Adds `delta` to the ticks carried by absorbed continuation packets and returns the sum,
    /// clearing the carry. When the sum would not fit a variable-length quantity the carry is
    /// flushed into an empty escape packet at the previous tick and `delta` alone is returned
    fn fold_carry(&mut self, delta: u32) -> u32 {
        let carry = std::mem::take(&mut self.state.carry);

        match carry.checked_add(delta) {
            Some(sum) if sum <= MAX_VAR_LEN => sum,
            _ => {
                debug!(track = self.index, carry, "Flushing carried continuation ticks");
                self.events.push(TimedEvent {
                    delta: carry,
                    ticks: self.state.ticks - delta as u64,
                    body: EventBody::SysEx(SysexEvent::Escape(vec![])),
                });
                delta
            }
        }
    }

    /// Records a warning if a System Exclusive message is still waiting for its terminator
    fn close_open_sysex(&mut self) {
        if self.state.open_sysex.take().is_some() {
            let err = self.reader.error(DecodeErrorKind::UnterminatedSysex);
            self.diagnostics.warn(err.in_track(self.index));
        }
    }

    /// Decodes the event following a delta time
    fn next_body(&mut self) -> DecodeResult<Decoded> {
        let status_offset = self.reader.offset();
        let status = match self.reader.peek_u8()? {
            byte if byte & 0x80 != 0 => {
                self.reader.read_u8()?;
                if byte < 0xF0 {
                    self.state.running_status = Some(byte);
                }
                byte
            }
            _ => self
                .state
                .running_status
                .ok_or_else(|| self.reader.error(DecodeErrorKind::MissingRunningStatus))?,
        };

        match status {
            0x80..=0xEF => self.channel_voice(status).map(Decoded::Event),
            0xFF => self.meta().map(Decoded::Event),
            SYSEX_START => {
                let packet = self.read_packet()?;
                Ok(Decoded::Event(EventBody::SysEx(SysexEvent::start(packet))))
            }
            SYSEX_END => {
                let packet = self.read_packet()?;
                match self.state.open_sysex {
                    Some(idx) => {
                        if let EventBody::SysEx(open) = &mut self.events[idx].body {
                            if !open.continue_with(packet) {
                                self.state.open_sysex = None;
                            }
                        }
                        Ok(Decoded::Continuation)
                    }
                    None => Ok(Decoded::Event(EventBody::SysEx(SysexEvent::Escape(
                        packet.to_vec(),
                    )))),
                }
            }
            other => Err(DecodeError::new(
                status_offset,
                DecodeErrorKind::UnknownEventType(other),
            )),
        }
    }

    /// Reads the data bytes of a channel voice message
    fn channel_voice(&mut self, status: u8) -> DecodeResult<EventBody> {
        let Some(kind) = VoiceKind::from_status(status) else {
            return Err(self.reader.error(DecodeErrorKind::UnknownEventType(status)));
        };

        let offset = self.reader.offset();
        let bytes = self.reader.read_bytes(kind.data_len())?;

        let mut data = [0u8; 2];
        for (idx, &byte) in bytes.iter().enumerate() {
            if byte & 0x80 != 0 {
                let err = DecodeError::new(offset + idx, DecodeErrorKind::InvalidDataByte(byte));
                self.diagnostics.soft(err.in_track(self.index))?;
            }
            data[idx] = byte & 0x7F;
        }

        Ok(EventBody::ChannelVoice(ChannelVoice {
            kind,
            channel: status & 0x0F,
            data,
        }))
    }

    /// Reads a meta event after its 0xFF status
    fn meta(&mut self) -> DecodeResult<EventBody> {
        let tag = self.reader.read_u8()?;
        let length = self.reader.read_var_len()?;
        let offset = self.reader.offset();
        let data = self.reader.read_bytes(length as usize)?;

        let meta = match MetaEvent::parse(tag, data) {
            Ok(meta) => meta,
            Err(kind) => {
                let err = DecodeError::new(offset, kind);
                self.diagnostics.soft(err.in_track(self.index))?;
                MetaEvent::Unknown(tag, data.to_vec())
            }
        };

        Ok(EventBody::Meta(meta))
    }

    /// Reads a length prefixed System Exclusive packet
    fn read_packet(&mut self) -> DecodeResult<&'a [u8]> {
        let length = self.reader.read_var_len()?;
        self.reader.read_bytes(length as usize)
    }
}
