//! Channel voice messages

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::writer::MidiWriteable;

/// The seven kinds of channel voice message, keyed by the high nibble of the status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VoiceKind {
    /// Turn Off event
    /// This message is sent when a note is released
    NoteOff,
    /// Turn On event
    /// This message is sent when a note is depressed
    NoteOn,
    /// Polyphonic Key Pressure
    /// This message is most often sent by pressing down a key after it "bottoms out"
    PolyPressure,
    /// Control change
    /// This message is sent when a controller value changes. Controllers include devices such as
    /// pedals and levers. Certain controller numbers are reserved.
    ControlChange,
    /// Program change.
    /// This message is sent when the patch number changes
    ProgramChange,
    /// Channel Pressure
    /// This message is most often sent by pressing down on a key after it "bottoms out"
    ChannelPressure,
    /// Pitch Wheel Change
    /// This message is sent to indicate a change in the pitch wheel as measured by a fourteen bit
    /// value.
    PitchBend,
}

impl VoiceKind {
    /// Kind for a status byte in 0x80..=0xEF
    pub fn from_status(status: u8) -> Option<Self> {
        match status >> 4 {
            0x8 => Some(Self::NoteOff),
            0x9 => Some(Self::NoteOn),
            0xA => Some(Self::PolyPressure),
            0xB => Some(Self::ControlChange),
            0xC => Some(Self::ProgramChange),
            0xD => Some(Self::ChannelPressure),
            0xE => Some(Self::PitchBend),
            _ => None,
        }
    }

    /// High nibble of the status byte
    pub fn status_nibble(&self) -> u8 {
        match self {
            Self::NoteOff => 0x8,
            Self::NoteOn => 0x9,
            Self::PolyPressure => 0xA,
            Self::ControlChange => 0xB,
            Self::ProgramChange => 0xC,
            Self::ChannelPressure => 0xD,
            Self::PitchBend => 0xE,
        }
    }

    /// Number of data bytes following the status byte
    pub fn data_len(&self) -> usize {
        match self {
            Self::ProgramChange | Self::ChannelPressure => 1,
            _ => 2,
        }
    }
}

/// A channel voice message. Data bytes are kept as they appear on the wire, the second byte is
/// zero for single byte kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelVoice {
    /// Message kind
    pub kind: VoiceKind,
    /// MIDI channel, 0-15
    pub channel: u8,
    /// Raw data bytes
    pub data: [u8; 2],
}

impl ChannelVoice {
    /// Creates a message, masking the channel to 4 bits and data to 7 bits
    pub fn new(kind: VoiceKind, channel: u8, data: [u8; 2]) -> Self {
        let data = match kind.data_len() {
            1 => [data[0] & 0x7F, 0],
            _ => [data[0] & 0x7F, data[1] & 0x7F],
        };

        Self {
            kind,
            channel: channel & 0x0F,
            data,
        }
    }

    /// A note on
    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(VoiceKind::NoteOn, channel, [key, velocity])
    }

    /// A note off
    pub fn note_off(channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(VoiceKind::NoteOff, channel, [key, velocity])
    }

    /// A controller change
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::new(VoiceKind::ControlChange, channel, [controller, value])
    }

    /// A program change
    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::new(VoiceKind::ProgramChange, channel, [program, 0])
    }

    /// A pitch bend from a 14 bit value, 0x2000 being centered
    pub fn pitch_bend(channel: u8, value: u16) -> Self {
        Self::new(
            VoiceKind::PitchBend,
            channel,
            [(value & 0x7F) as u8, (value >> 7) as u8],
        )
    }

    /// The status byte this message is sent with
    pub fn status(&self) -> u8 {
        (self.kind.status_nibble() << 4) | self.channel
    }

    /// Key for note and polyphonic pressure messages
    pub fn key(&self) -> Option<u8> {
        match self.kind {
            VoiceKind::NoteOff | VoiceKind::NoteOn | VoiceKind::PolyPressure => Some(self.data[0]),
            _ => None,
        }
    }

    /// Velocity for note messages
    pub fn velocity(&self) -> Option<u8> {
        match self.kind {
            VoiceKind::NoteOff | VoiceKind::NoteOn => Some(self.data[1]),
            _ => None,
        }
    }

    /// Controller number and value for control changes
    pub fn controller(&self) -> Option<(u8, u8)> {
        match self.kind {
            VoiceKind::ControlChange => Some((self.data[0], self.data[1])),
            _ => None,
        }
    }

    /// Program number for program changes
    pub fn program(&self) -> Option<u8> {
        match self.kind {
            VoiceKind::ProgramChange => Some(self.data[0]),
            _ => None,
        }
    }

    /// Pressure for polyphonic and channel pressure messages
    pub fn pressure(&self) -> Option<u8> {
        match self.kind {
            VoiceKind::PolyPressure => Some(self.data[1]),
            VoiceKind::ChannelPressure => Some(self.data[0]),
            _ => None,
        }
    }

    /// The fourteen bit pitch wheel value, least significant 7 bits first on the wire
    pub fn bend(&self) -> Option<u16> {
        match self.kind {
            VoiceKind::PitchBend => Some(((self.data[1] as u16) << 7) | self.data[0] as u16),
            _ => None,
        }
    }

    /// A note on with a non-zero velocity
    pub fn is_note_on(&self) -> bool {
        self.kind == VoiceKind::NoteOn && self.data[1] > 0
    }

    /// A note off, or a note on with velocity 0 which sequencers send in its place
    pub fn is_note_off(&self) -> bool {
        match self.kind {
            VoiceKind::NoteOff => true,
            VoiceKind::NoteOn => self.data[1] == 0,
            _ => false,
        }
    }
}

impl MidiWriteable for ChannelVoice {
    fn to_midi_bytes(self) -> Vec<u8> {
        let mut bytes = vec![self.status()];
        bytes.extend(&self.data[..self.kind.data_len()]);

        bytes
    }
}
