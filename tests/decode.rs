//! Decoding whole files, from disk and from memory

use midtime::{
    builder::{MidiBuilder, TrackBuilder},
    chunk::{
        header::{Division, Format},
        track::{event::ChannelVoice, meta::MetaEvent, sysex::SysexEvent, EventBody},
    },
    decode, decode_with,
    error::{DecodeErrorKind, LoadError},
    DecodeOptions, MidiFile,
};
use pretty_assertions::assert_eq;

/// Fixture: format 1 at 480 ticks per beat, a tempo track switching from 120 to 240 BPM at tick
/// 960 and a piano track relying on running status
const FIXTURE: &str = "test/tempo_change.mid";

#[test]
fn fixture_loads_from_disk() {
    let midi = MidiFile::open(FIXTURE).expect("Load fixture");

    assert_eq!(midi.header().format(), Format::One);
    assert_eq!(midi.header().ticks_per_beat(), Some(480));
    assert_eq!(midi.tracks().len(), 2);
    assert!(midi.warnings().is_empty());

    let names: Vec<_> = midi.tracks().iter().map(|track| track.name()).collect();
    assert_eq!(
        names,
        vec![Some("Tempo".to_string()), Some("Piano".to_string())]
    );
}

#[test]
fn fixture_running_status_events() {
    let midi = MidiFile::open(FIXTURE).expect("Load fixture");
    let piano = midi.track(1).expect("Piano track");

    let notes: Vec<_> = piano
        .iter()
        .filter_map(|event| match &event.body {
            EventBody::ChannelVoice(voice) => voice.key().map(|key| {
                (
                    event.ticks,
                    key,
                    voice.is_note_on(),
                    voice.is_note_off(),
                )
            }),
            _ => None,
        })
        .collect();

    assert_eq!(
        notes,
        vec![
            (0, 60, true, false),
            (480, 60, false, true),
            (480, 64, true, false),
            (1440, 64, false, true),
        ]
    );
}

#[test]
fn fixture_times_follow_tempo_change() {
    let midi = MidiFile::open(FIXTURE).expect("Load fixture");

    let seconds: Vec<_> = midi
        .timed_events(1)
        .expect("Piano track")
        .map(|(seconds, _)| seconds)
        .collect();
    assert_eq!(seconds, vec![0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 1.25, 1.5]);

    assert_eq!(midi.duration(), Some(1.5));
    assert_eq!(midi.tempo_events().count(), 2);

    let time_signature = midi.tracks()[0].iter().find_map(|event| match &event.body {
        EventBody::Meta(MetaEvent::TimeSignature(sig)) => Some((sig.numerator, sig.denominator())),
        _ => None,
    });
    assert_eq!(time_signature, Some((4, Some(4))));
}

#[test]
fn deltas_sum_to_absolute_ticks() {
    let midi = MidiFile::open(FIXTURE).expect("Load fixture");

    for track in midi.tracks() {
        let total: u64 = track.iter().map(|event| event.delta as u64).sum();
        assert_eq!(total, track.end_ticks());
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let err = MidiFile::open("test/does_not_exist.mid").unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[test]
fn short_header_reports_its_offset() {
    let bytes = [b'M', b'T', b'h', b'd', 0, 0, 0, 4, 0, 1, 0, 1];
    let err = decode(&bytes).unwrap_err();

    assert!(matches!(err.kind(), DecodeErrorKind::MalformedHeader(_)));
    assert_eq!(err.offset(), 8);
    assert_eq!(err.track(), None);
}

#[test]
fn truncated_event_reports_offset_and_track() {
    let mut bytes = vec![
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 3,
    ];
    // Note on missing its velocity
    bytes.extend([0x00, 0x90, 0x3C]);

    let err = decode(&bytes).unwrap_err();
    assert_eq!(err.kind(), &DecodeErrorKind::TruncatedData);
    assert_eq!(err.offset(), 24);
    assert_eq!(err.track(), Some(0));
}

#[test]
fn trailing_bytes_after_end_of_track() {
    let bytes = [
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 6, //
        0x00, 0xFF, 0x2F, 0x00, 0x12, 0x34,
    ];

    let err = decode(&bytes).unwrap_err();
    assert_eq!(err.kind(), &DecodeErrorKind::UnexpectedTrailingData(2));

    let midi = decode_with(&bytes, &DecodeOptions::lenient()).expect("Lenient decode");
    assert_eq!(midi.tracks()[0].len(), 1);
    assert_eq!(midi.warnings().len(), 1);
}

#[test]
fn fixture_survives_rebuild() {
    let midi = MidiFile::open(FIXTURE).expect("Load fixture");
    let rebuilt = decode(&MidiBuilder::from(&midi).build()).expect("Decode rebuilt file");

    assert_eq!(rebuilt.header(), midi.header());
    assert_eq!(rebuilt.tracks(), midi.tracks());
}

#[test]
fn split_sysex_keeps_absolute_time() {
    let bytes = [
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 18, //
        0x00, 0xF0, 0x02, 0x43, 0x12, // open message
        0x10, 0xF7, 0x02, 0x00, 0xF7, // continuation ends it
        0x05, 0x90, 0x3C, 0x64, // note 5 ticks later
        0x00, 0xFF, 0x2F, 0x00,
    ];

    let midi = decode(&bytes).expect("Decode file");
    let track = &midi.tracks()[0];

    assert_eq!(
        track.events()[0].body,
        EventBody::SysEx(SysexEvent::message(vec![0x43, 0x12, 0x00]))
    );
    assert_eq!(track.events()[1].delta, 0x15);
    assert_eq!(track.events()[1].ticks, 0x15);
    assert_eq!(track.len(), 3);
}

#[test]
fn smpte_division_ignores_tempo() {
    let bytes = MidiBuilder::new(
        Format::Zero,
        Division::from(0xE728u16), // -25 fps, 40 ticks per frame
    )
    .track(
        TrackBuilder::new()
            .event(0, EventBody::Meta(MetaEvent::SetTempo(250_000)))
            .event(1000, EventBody::ChannelVoice(ChannelVoice::note_on(0, 60, 1))),
    )
    .build();

    let midi = decode(&bytes).expect("Decode file");
    assert_eq!(midi.tick_to_seconds(0, 1000), Some(1.0));
    assert_eq!(midi.header().ticks_per_beat(), None);
}

#[test]
fn long_split_sysex_survives_rebuild() {
    let mut data = vec![0x00, 0xF0, 0x01, 0x43];
    for _ in 0..2 {
        data.extend([0xFF, 0xFF, 0xFF, 0x7F, 0xF7, 0x00]); // continuation at the largest delta
    }
    data.extend([0x00, 0xF7, 0x01, 0xF7]);
    data.extend([0x00, 0xFF, 0x2F, 0x00]);

    let mut bytes = vec![
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96, //
        b'M', b'T', b'r', b'k',
    ];
    bytes.extend((data.len() as u32).to_be_bytes());
    bytes.extend(data);

    let midi = decode(&bytes).expect("Decode file");
    assert_eq!(midi.tracks()[0].end_ticks(), 2 * 0x0FFF_FFFF);

    let rebuilt = decode(&MidiBuilder::from(&midi).build()).expect("Decode rebuilt file");
    assert_eq!(rebuilt.tracks(), midi.tracks());
}

#[test]
fn fixture_gaps_span_tempo_change() {
    let midi = MidiFile::open(FIXTURE).expect("Load fixture");

    let mut previous = 0.0;
    let gaps: Vec<_> = midi
        .timed_events(1)
        .expect("Piano track")
        .map(|(seconds, event)| {
            let gap = seconds - previous;
            previous = seconds;
            (event.ticks, gap)
        })
        .filter(|(_, gap)| *gap > 0.0)
        .collect();

    // The note off at 1440 starts under 120 BPM and ends under 240 BPM
    assert_eq!(gaps, vec![(480, 0.5), (1440, 0.75), (1920, 0.25)]);
}
