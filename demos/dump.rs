//! Example program that prints every event of a MIDI file with its timing. Pass a path as the
//! first argument, `test/tempo_change.mid` is used otherwise

use midtime::{
    chunk::track::{event::ChannelVoice, meta::MetaEvent, EventBody},
    timing::tempo_to_bpm,
    MidiFile,
};

/// Prints the details of a channel voice message worth calling out
fn print_voice(event: &ChannelVoice) {
    let channel = event.channel;

    if let (Some(key), Some(velocity)) = (event.key(), event.velocity()) {
        if event.is_note_on() {
            println!("    NOTE ON: Note={key}, Velocity={velocity}, Channel={channel}");
        } else if event.is_note_off() && velocity == 0 {
            println!("    NOTE OFF (note on, velocity 0): Note={key}, Channel={channel}");
        } else if event.is_note_off() {
            println!("    NOTE OFF: Note={key}, Velocity={velocity}, Channel={channel}");
        }
    } else if let Some(program) = event.program() {
        println!("    PROGRAM CHANGE: Program={program}, Channel={channel}");
    } else if let Some((control, value)) = event.controller() {
        println!("    CONTROL CHANGE: Control={control}, Value={value}, Channel={channel}");
    }
}

/// Prints the details of a meta event worth calling out
fn print_meta(event: &MetaEvent) {
    match event {
        MetaEvent::SetTempo(tempo) => println!(
            "    Meta: Tempo changed to {tempo} us/beat (approx {:.2} BPM)",
            tempo_to_bpm(*tempo)
        ),
        MetaEvent::TimeSignature(sig) => println!(
            "    Meta: Time Signature: {}/{}, clocks: {}, 32nds: {}",
            sig.numerator,
            sig.denominator().unwrap_or(0),
            sig.clocks_per_click,
            sig.thirty_seconds_per_quarter
        ),
        MetaEvent::TrackName(_) => {
            println!("    Meta: Track Name: {}", event.text().unwrap_or_default())
        }
        _ => {}
    }
}

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "test/tempo_change.mid".to_string());

    let midi = match MidiFile::open(&path) {
        Ok(midi) => midi,
        Err(err) => {
            eprintln!("Failed to load {path}: {err}");
            std::process::exit(1);
        }
    };

    let header = midi.header();
    println!("Successfully loaded MIDI file: {path}");
    println!("Type: {:?}", header.format());
    match header.ticks_per_beat() {
        Some(tpb) => println!("Ticks per beat: {tpb}"),
        None => println!("Division: {:?}", header.division()),
    }
    println!("Tracks: {}", midi.tracks().len());
    println!("{}", "-".repeat(30));

    for (index, track) in midi.tracks().iter().enumerate() {
        println!("\n--- Track {index} ---");
        println!("Track Name: {}", track.name().unwrap_or_default());

        let Some(events) = midi.timed_events(index) else {
            continue;
        };

        let mut previous = 0.0;
        for (i, (seconds, event)) in events.enumerate() {
            let delta_seconds = seconds - previous;
            previous = seconds;

            println!(
                "  Msg {i}: {:?} (Delta: {} ticks / {delta_seconds:.4} s, Abs Time: {seconds:.4} s)",
                event.body, event.delta
            );

            match &event.body {
                EventBody::ChannelVoice(voice) => print_voice(voice),
                EventBody::Meta(meta) => print_meta(meta),
                EventBody::SysEx(_) => {}
            }
        }
    }

    if let Some(duration) = midi.duration() {
        println!("\nDuration: {duration:.4} s");
    }
}
