//! Meta Event Structs and Parsing

use std::borrow::Cow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::DecodeErrorKind,
    writer::{to_midi_vlq, MidiWriteable},
};

/// Meta type byte of the End of Track event
pub const END_OF_TRACK: u8 = 0x2F;
/// Meta type byte of the Set Tempo event
pub const SET_TEMPO: u8 = 0x51;

/// A meta level event
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MetaEvent {
    /// Sequence Number, tag 0x00
    SequenceNumber(u16),
    /// Text metadata, tag 0x01
    Text(Vec<u8>),
    /// Copyright, tag 0x02
    Copyright(Vec<u8>),
    /// Track name, tag 0x03
    TrackName(Vec<u8>),
    /// Instrument name, tag 0x04
    InstrumentName(Vec<u8>),
    /// Lyric, tag 0x05
    Lyric(Vec<u8>),
    /// Marker, tag 0x06
    Marker(Vec<u8>),
    /// Cue Point, tag 0x07
    CuePoint(Vec<u8>),
    /// Program name, tag 0x08
    ProgramName(Vec<u8>),
    /// Device name, tag 0x09
    DeviceName(Vec<u8>),
    /// Midi Channel Prefix, tag 0x20
    MidiChannelPrefix(u8),
    /// Midi port, tag 0x21
    MidiPort(u8),
    /// End of Track Identifier, tag 0x2F
    EndOfTrack,
    /// Tempo in microseconds per quarter note, tag 0x51
    SetTempo(u32),
    /// Smpte Offset, tag 0x54
    SmpteOffset(SmpteOffset),
    /// Time signature, tag 0x58
    TimeSignature(TimeSignature),
    /// Key Signature, tag 0x59
    KeySignature(KeySignature),
    /// Sequencer Specific, tag 0x7f
    SequencerSpecific(Vec<u8>),
    /// A meta event with an unrecognized tag, or one whose payload could not be parsed in
    /// lenient mode
    Unknown(u8, Vec<u8>),
}

impl MetaEvent {
    /// Returns the specific event's tag
    pub fn tag(&self) -> u8 {
        match self {
            Self::SequenceNumber(_) => 0x00,
            Self::Text(_) => 0x01,
            Self::Copyright(_) => 0x02,
            Self::TrackName(_) => 0x03,
            Self::InstrumentName(_) => 0x04,
            Self::Lyric(_) => 0x05,
            Self::Marker(_) => 0x06,
            Self::CuePoint(_) => 0x07,
            Self::ProgramName(_) => 0x08,
            Self::DeviceName(_) => 0x09,
            Self::MidiChannelPrefix(_) => 0x20,
            Self::MidiPort(_) => 0x21,
            Self::EndOfTrack => END_OF_TRACK,
            Self::SetTempo(_) => SET_TEMPO,
            Self::SmpteOffset(_) => 0x54,
            Self::TimeSignature(_) => 0x58,
            Self::KeySignature(_) => 0x59,
            Self::SequencerSpecific(_) => 0x7F,
            Self::Unknown(tag, _) => *tag,
        }
    }

    /// Parses a meta event from its tag and payload. Fails if the payload does not have the shape
    /// the tag requires
    pub fn parse(tag: u8, data: &[u8]) -> Result<Self, DecodeErrorKind> {
        let invalid = || DecodeErrorKind::InvalidMetaEvent {
            tag,
            len: data.len(),
        };

        macro_rules! meta_event {
            ($len: expr_2021, $name: expr_2021, $value: expr_2021) => {{
                if data.len() != $len {
                    return Err(invalid());
                }
                Ok($name($value))
            }};
        }

        match tag {
            0x00 => meta_event!(
                2,
                MetaEvent::SequenceNumber,
                u16::from_be_bytes([data[0], data[1]])
            ),
            0x01 => Ok(MetaEvent::Text(data.to_vec())),
            0x02 => Ok(MetaEvent::Copyright(data.to_vec())),
            0x03 => Ok(MetaEvent::TrackName(data.to_vec())),
            0x04 => Ok(MetaEvent::InstrumentName(data.to_vec())),
            0x05 => Ok(MetaEvent::Lyric(data.to_vec())),
            0x06 => Ok(MetaEvent::Marker(data.to_vec())),
            0x07 => Ok(MetaEvent::CuePoint(data.to_vec())),
            0x08 => Ok(MetaEvent::ProgramName(data.to_vec())),
            0x09 => Ok(MetaEvent::DeviceName(data.to_vec())),

            0x20 => meta_event!(1, MetaEvent::MidiChannelPrefix, data[0]),
            0x21 => meta_event!(1, MetaEvent::MidiPort, data[0]),
            // Some writers put junk in the payload, the tag alone ends the track
            END_OF_TRACK => Ok(MetaEvent::EndOfTrack),

            SET_TEMPO => meta_event!(
                3,
                MetaEvent::SetTempo,
                u32::from_be_bytes([0, data[0], data[1], data[2]])
            ),
            0x54 => meta_event!(
                5,
                MetaEvent::SmpteOffset,
                SmpteOffset {
                    hours: data[0],
                    minutes: data[1],
                    seconds: data[2],
                    frames: data[3],
                    subframes: data[4]
                }
            ),
            0x58 => meta_event!(
                4,
                MetaEvent::TimeSignature,
                TimeSignature {
                    numerator: data[0],
                    denominator_pow: data[1],
                    clocks_per_click: data[2],
                    thirty_seconds_per_quarter: data[3],
                }
            ),
            0x59 => {
                let key = match data {
                    [sharps_flats, mode @ (0 | 1)] if (-7..=7).contains(&(*sharps_flats as i8)) => {
                        KeySignature {
                            sharps_flats: *sharps_flats as i8,
                            minor: *mode == 1,
                        }
                    }
                    _ => return Err(invalid()),
                };
                Ok(MetaEvent::KeySignature(key))
            }

            0x7F => Ok(MetaEvent::SequencerSpecific(data.to_vec())),

            _ => Ok(MetaEvent::Unknown(tag, data.to_vec())),
        }
    }

    /// The raw payload bytes of the event as they are written after the length
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::SequenceNumber(val) => val.to_midi_bytes(),
            Self::Text(val)
            | Self::Copyright(val)
            | Self::TrackName(val)
            | Self::InstrumentName(val)
            | Self::Lyric(val)
            | Self::Marker(val)
            | Self::CuePoint(val)
            | Self::ProgramName(val)
            | Self::DeviceName(val)
            | Self::SequencerSpecific(val)
            | Self::Unknown(_, val) => val.clone(),
            Self::MidiChannelPrefix(val) | Self::MidiPort(val) => val.to_midi_bytes(),
            Self::EndOfTrack => vec![],
            Self::SetTempo(val) => val.to_be_bytes()[1..].to_vec(),
            Self::SmpteOffset(val) => val.to_midi_bytes(),
            Self::TimeSignature(val) => val.to_midi_bytes(),
            Self::KeySignature(val) => val.to_midi_bytes(),
        }
    }

    /// Text of the text-like events, decoded as UTF-8 with invalid sequences replaced
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(val)
            | Self::Copyright(val)
            | Self::TrackName(val)
            | Self::InstrumentName(val)
            | Self::Lyric(val)
            | Self::Marker(val)
            | Self::CuePoint(val)
            | Self::ProgramName(val)
            | Self::DeviceName(val) => Some(String::from_utf8_lossy(val)),
            _ => None,
        }
    }
}

impl MidiWriteable for MetaEvent {
    fn to_midi_bytes(self) -> Vec<u8> {
        let payload_bytes = self.payload();
        let mut bytes = vec![0xFF, self.tag()];

        let length = payload_bytes.len() as u32;
        bytes.extend(to_midi_vlq(length));
        bytes.extend(payload_bytes);

        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A key signature
pub struct KeySignature {
    /// Sharps (positive) or flats (negative), -7 to 7
    pub sharps_flats: i8,
    /// True if in minor, false if in major
    pub minor: bool,
}

impl MidiWriteable for KeySignature {
    fn to_midi_bytes(self) -> Vec<u8> {
        let mut bytes = self.sharps_flats.to_midi_bytes();
        bytes.push(self.minor as u8);

        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// An SMPTE Offset
pub struct SmpteOffset {
    /// Hours of offset
    pub hours: u8,
    /// Minutes of offset
    pub minutes: u8,
    /// Seconds of offset
    pub seconds: u8,
    /// Frames of offset
    pub frames: u8,
    /// Subframes of offset
    pub subframes: u8,
}

impl MidiWriteable for SmpteOffset {
    fn to_midi_bytes(self) -> Vec<u8> {
        let SmpteOffset {
            hours,
            minutes,
            seconds,
            frames,
            subframes,
        } = self;
        vec![hours, minutes, seconds, frames, subframes]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A Time Signature
pub struct TimeSignature {
    /// The time signature's numerator
    pub numerator: u8,
    /// The denominator as a power of two, 2 meaning a quarter note
    pub denominator_pow: u8,
    /// MIDI clocks per metronome click
    pub clocks_per_click: u8,
    /// Notated thirty second notes per quarter note
    pub thirty_seconds_per_quarter: u8,
}

impl TimeSignature {
    /// The denominator as a note value, `None` if it does not fit in 32 bits
    pub fn denominator(&self) -> Option<u32> {
        1u32.checked_shl(self.denominator_pow as u32)
    }
}

impl MidiWriteable for TimeSignature {
    fn to_midi_bytes(self) -> Vec<u8> {
        vec![
            self.numerator,
            self.denominator_pow,
            self.clocks_per_click,
            self.thirty_seconds_per_quarter,
        ]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        chunk::track::meta::{KeySignature, MetaEvent, SmpteOffset, TimeSignature},
        error::DecodeErrorKind,
        writer::MidiWriteable,
    };

    /// Parses a full `FF tag len payload` byte run the way the track decoder does
    fn parse(bytes: &[u8]) -> Result<MetaEvent, DecodeErrorKind> {
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(bytes[2] as usize, bytes.len() - 3);
        MetaEvent::parse(bytes[1], &bytes[3..])
    }

    #[test]
    fn test_tempo_event() {
        let data = [0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]; // 500,000 microseconds/quarter note
        assert_eq!(parse(&data), Ok(MetaEvent::SetTempo(500_000)));
    }

    #[test]
    fn test_time_signature_event() {
        let data = [0xFF, 0x58, 0x04, 0x06, 0x03, 0x24, 0x08];
        let parsed = parse(&data).unwrap();
        let expected = TimeSignature {
            numerator: 6,
            denominator_pow: 3,
            clocks_per_click: 36,
            thirty_seconds_per_quarter: 8,
        };

        assert_eq!(parsed, MetaEvent::TimeSignature(expected));
        assert_eq!(expected.denominator(), Some(8));
    }

    #[test]
    fn test_text_is_lossy_utf8() {
        let event = parse(&[0xFF, 0x03, 0x04, b'P', b'n', 0xE9, b'o']).unwrap();
        assert_eq!(event, MetaEvent::TrackName(vec![b'P', b'n', 0xE9, b'o']));
        assert_eq!(event.text().as_deref(), Some("Pn\u{FFFD}o"));
        assert_eq!(MetaEvent::SetTempo(1).text(), None);
    }

    #[test]
    fn test_end_of_track_ignores_payload() {
        assert_eq!(parse(&[0xFF, 0x2F, 0x00]), Ok(MetaEvent::EndOfTrack));
        assert_eq!(parse(&[0xFF, 0x2F, 0x01, 0x00]), Ok(MetaEvent::EndOfTrack));
    }

    #[test]
    fn test_unknown_event() {
        let data = [0xFF, 0x99, 0x03, 0x01, 0x02, 0x03];
        assert_eq!(
            parse(&data),
            Ok(MetaEvent::Unknown(0x99, vec![0x01, 0x02, 0x03]))
        );
    }

    #[test]
    fn test_invalid_length() {
        let data = [0xFF, 0x51, 0x02, 0x07, 0xA1];
        assert_eq!(
            parse(&data),
            Err(DecodeErrorKind::InvalidMetaEvent { tag: 0x51, len: 2 })
        );
    }

    #[test]
    fn test_invalid_key_signature() {
        assert!(parse(&[0xFF, 0x59, 0x02, 0x08, 0x00]).is_err());
        assert!(parse(&[0xFF, 0x59, 0x02, 0x00, 0x02]).is_err());
        assert_eq!(
            parse(&[0xFF, 0x59, 0x02, 0xFD, 0x01]),
            Ok(MetaEvent::KeySignature(KeySignature {
                sharps_flats: -3,
                minor: true,
            }))
        );
    }

    macro_rules! meta_event_test {
        ($name:ident, $event:expr_2021, $data:expr_2021) => {
            #[test]
            fn $name() {
                let data: Vec<u8> = $data;
                let expected = $event;
                assert_eq!(parse(&data), Ok(expected.clone()));

                let serialized = expected.to_midi_bytes();
                assert_eq!(serialized, data);
            }
        };
    }

    meta_event_test!(
        sequence_number_event,
        MetaEvent::SequenceNumber(1),
        vec![0xFF, 0x00, 0x02, 0x00, 0x01]
    );

    meta_event_test!(
        marker_event,
        MetaEvent::Marker(b"Marker".to_vec()),
        vec![0xFF, 0x06, 0x06, b'M', b'a', b'r', b'k', b'e', b'r']
    );

    meta_event_test!(
        midi_port_event,
        MetaEvent::MidiPort(0x05),
        vec![0xFF, 0x21, 0x01, 0x05]
    );

    meta_event_test!(
        smpte_offset_event,
        MetaEvent::SmpteOffset(SmpteOffset {
            hours: 1,
            minutes: 32,
            seconds: 21,
            frames: 16,
            subframes: 0,
        }),
        vec![0xFF, 0x54, 0x05, 0x01, 0x20, 0x15, 0x10, 0x00]
    );

    meta_event_test!(
        set_tempo_event,
        MetaEvent::SetTempo(250_000),
        vec![0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90]
    );
}
