//! System Exclusive Messages

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::writer::{to_midi_vlq, MidiWriteable};

/// Status byte starting a System Exclusive message
pub const SYSEX_START: u8 = 0xF0;
/// Status byte of a continuation or escape packet, and the message terminator
pub const SYSEX_END: u8 = 0xF7;

/// A System Exclusive event. Messages split across `0xF7` continuation packets are stored as one
/// logical message with the packets' payloads concatenated
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SysexEvent {
    /// A message started by `0xF0`
    Message {
        /// Message bytes after the `0xF0` status, without the terminating `0xF7`
        payload: Vec<u8>,
        /// Whether a terminating `0xF7` was seen
        terminated: bool,
    },
    /// An `0xF7` packet outside of any open message, carrying arbitrary bytes such as real time
    /// messages
    Escape(Vec<u8>),
}

impl SysexEvent {
    /// A complete message with the given payload
    pub fn message(payload: Vec<u8>) -> Self {
        Self::Message {
            payload,
            terminated: true,
        }
    }

    /// Builds the event for an `0xF0` packet
    pub(crate) fn start(packet: &[u8]) -> Self {
        let (payload, terminated) = split_terminator(packet);
        Self::Message {
            payload: payload.to_vec(),
            terminated,
        }
    }

    /// True for a message still waiting for its terminating `0xF7`
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::Message {
                terminated: false,
                ..
            }
        )
    }

    /// Appends an `0xF7` continuation packet to an open message, returning whether the message is
    /// still open
    pub(crate) fn continue_with(&mut self, packet: &[u8]) -> bool {
        match self {
            Self::Message {
                payload,
                terminated,
            } if !*terminated => {
                let (bytes, done) = split_terminator(packet);
                payload.extend_from_slice(bytes);
                *terminated = done;
                !done
            }
            _ => false,
        }
    }

    /// The payload bytes, without status or terminator
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Message { payload, .. } => payload,
            Self::Escape(payload) => payload,
        }
    }

    /// The manufacturer ID at the start of a message payload
    pub fn manufacturer(&self) -> Option<ManufactureId> {
        match self {
            Self::Message { payload, .. } => match payload.as_slice() {
                [0x00, b, c, ..] => Some(ManufactureId::ThreeByte([0x00, *b, *c])),
                [0x00, ..] => None,
                [a, ..] => Some(ManufactureId::OneByte(*a)),
                [] => None,
            },
            Self::Escape(_) => None,
        }
    }
}

/// Strips a trailing `0xF7`, reporting whether it was present
fn split_terminator(packet: &[u8]) -> (&[u8], bool) {
    match packet.split_last() {
        Some((&SYSEX_END, rest)) => (rest, true),
        _ => (packet, false),
    }
}

impl MidiWriteable for SysexEvent {
    fn to_midi_bytes(self) -> Vec<u8> {
        let (status, mut data) = match self {
            Self::Message {
                payload,
                terminated,
            } => {
                let mut data = payload;
                if terminated {
                    data.push(SYSEX_END);
                }
                (SYSEX_START, data)
            }
            Self::Escape(payload) => (SYSEX_END, payload),
        };

        let mut bytes = vec![status];
        bytes.extend(to_midi_vlq(data.len() as u32));
        bytes.append(&mut data);

        bytes
    }
}

/// A manufacturer's ID. Can be either a 1 byte variant or 3 bytes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ManufactureId {
    /// One byte ID
    OneByte(u8),
    /// Three byte ID
    ThreeByte([u8; 3]),
}
