//! The `MidiWriteable` trait translates decoded values back into raw MIDI bytes. Where the decoder
//! turns bytes *into* Rust types, `MidiWriteable` does the opposite, and the
//! [`builder`](crate::builder) uses it to assemble a complete Standard MIDI File.

use crate::{chunk::header::HeaderChunk, Chunk};

/// A trait for types that can be encoded as MIDI-format bytes.
///
/// `MidiWriteable` is implemented by several primitive numeric types for convenience,
/// as well as by [`Chunk`] and the event types of a track.
pub trait MidiWriteable {
    /// Converts the data to a MIDI format byte sequence
    fn to_midi_bytes(self) -> Vec<u8>;
}

/// Encodes a value as a MIDI variable-length quantity
pub fn to_midi_vlq(mut value: u32) -> Vec<u8> {
    let mut bytes = Vec::new();

    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if !bytes.is_empty() {
            byte |= 0x80;
        }

        bytes.push(byte);

        if value == 0 {
            break;
        }
    }

    bytes.reverse();
    bytes
}

impl MidiWriteable for u8 {
    fn to_midi_bytes(self) -> Vec<u8> {
        vec![self]
    }
}

impl MidiWriteable for i8 {
    fn to_midi_bytes(self) -> Vec<u8> {
        vec![self.to_be_bytes()[0]]
    }
}

impl MidiWriteable for u16 {
    fn to_midi_bytes(self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl MidiWriteable for u32 {
    fn to_midi_bytes(self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl MidiWriteable for [char; 4] {
    fn to_midi_bytes(self) -> Vec<u8> {
        vec![self[0] as u8, self[1] as u8, self[2] as u8, self[3] as u8]
    }
}

impl MidiWriteable for Chunk {
    fn to_midi_bytes(self) -> Vec<u8> {
        let Chunk { chunk_type, length } = self;

        let mut chunk_type_bytes = chunk_type.to_midi_bytes();
        let len_bytes = length.to_midi_bytes();

        chunk_type_bytes.extend(len_bytes.iter());

        chunk_type_bytes
    }
}

impl MidiWriteable for (Chunk, Vec<u8>) {
    fn to_midi_bytes(self) -> Vec<u8> {
        let mut bytes = self.0.to_midi_bytes();
        bytes.extend(self.1.iter());

        bytes
    }
}

impl MidiWriteable for HeaderChunk {
    fn to_midi_bytes(self) -> Vec<u8> {
        let mut bytes = u16::from(self.format()).to_midi_bytes();
        bytes.extend(self.ntrks().to_midi_bytes());
        bytes.extend(u16::from(self.division()).to_midi_bytes());

        bytes
    }
}
