//! Example program that decodes a MIDI file and writes it back out through the builder

use std::{fs::File, io::Write};

use midtime::{builder::MidiBuilder, MidiFile};

fn main() {
    let midi = MidiFile::open("test/tempo_change.mid").expect("Decode `tempo_change.mid`");

    let mut output = File::create("test/test_copy.mid").expect("Create new output file");
    output
        .write_all(&MidiBuilder::from(&midi).build())
        .expect("Failed to write bytes");
}
