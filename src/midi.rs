use std::io::Cursor;

use midly::num::u7;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use crate::constants::{DEFAULT_QPM, STEPS_PER_QUARTER, TICKS_PER_BEAT};
use crate::error::GenerateError;
use crate::sequence::NoteSequence;

#[derive(Debug, Clone)]
struct TrackEventAbsolute<'a> {
    tick: u32,
    kind: TrackEventKind<'a>,
}

fn ordered_note_events(sequence: &NoteSequence, ticks_per_step: u32) -> Vec<TrackEvent<'static>> {
    let mut events_absolute: Vec<TrackEventAbsolute> = vec![];
    for note in &sequence.notes {
        events_absolute.push(TrackEventAbsolute {
            tick: note.quantized_start_step * ticks_per_step,
            kind: TrackEventKind::Midi {
                channel: note.instrument.into(),
                message: MidiMessage::NoteOn {
                    key: u7::new(note.pitch),
                    vel: u7::new(note.velocity),
                },
            },
        });
        events_absolute.push(TrackEventAbsolute {
            tick: note.quantized_end_step * ticks_per_step,
            kind: TrackEventKind::Midi {
                channel: note.instrument.into(),
                message: MidiMessage::NoteOff {
                    key: u7::new(note.pitch),
                    vel: u7::new(note.velocity),
                },
            },
        });
    }

    // Releases sort ahead of attacks on the same tick so a retriggered pitch
    // is not silenced by the previous note's release.
    events_absolute.sort_by_key(|event| {
        let rank = match event.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOff { .. },
                ..
            } => 0,
            _ => 1,
        };
        (event.tick, rank)
    });

    let mut events = vec![];
    let mut previous_tick = 0;
    for event_absolute in events_absolute {
        events.push(TrackEvent {
            delta: (event_absolute.tick - previous_tick).into(),
            kind: event_absolute.kind,
        });
        previous_tick = event_absolute.tick;
    }

    events
}

/// Serialize a note sequence to Standard MIDI File bytes.
///
/// The first tempo entry becomes the track's tempo meta event (falling back to
/// 120 QPM when the list is empty) and note timings are laid out from their
/// quantized steps at the sequence's steps-per-quarter resolution. A missing
/// or zero resolution falls back to 4 steps per quarter.
pub fn sequence_to_midi_bytes(sequence: &NoteSequence) -> Result<Vec<u8>, GenerateError> {
    let steps_per_quarter = sequence
        .quantization
        .map(|q| q.steps_per_quarter)
        .filter(|steps| *steps > 0)
        .unwrap_or(STEPS_PER_QUARTER);
    let ticks_per_step = u32::from(TICKS_PER_BEAT) / steps_per_quarter;

    let qpm = sequence
        .tempos
        .first()
        .map(|tempo| tempo.qpm)
        .filter(|qpm| *qpm > 0.0)
        .unwrap_or(DEFAULT_QPM);

    let mut smf = Smf::new(Header {
        format: Format::SingleTrack,
        timing: Timing::Metrical(TICKS_PER_BEAT.into()),
    });
    let mut track = Track::new();

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(
            ((60_000_000.0 / f64::from(qpm)).round() as u32).into(),
        )),
    });

    for event in ordered_note_events(sequence, ticks_per_step) {
        track.push(event);
    }

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    smf.tracks.push(track);

    let mut buffer = Vec::new();
    smf.write_std(&mut Cursor::new(&mut buffer))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sequence::{Note, QuantizationInfo, Tempo};

    fn two_note_sequence() -> NoteSequence {
        NoteSequence {
            notes: vec![
                Note {
                    pitch: 60,
                    velocity: 80,
                    instrument: 0,
                    quantized_start_step: 0,
                    quantized_end_step: 2,
                },
                Note {
                    pitch: 64,
                    velocity: 80,
                    instrument: 0,
                    quantized_start_step: 2,
                    quantized_end_step: 4,
                },
            ],
            tempos: vec![Tempo { qpm: 80.0 }],
            quantization: Some(QuantizationInfo {
                steps_per_quarter: 4,
            }),
            total_quantized_steps: 4,
        }
    }

    #[test]
    fn output_parses_as_single_track_smf() {
        let bytes = sequence_to_midi_bytes(&two_note_sequence()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(smf.header.timing, Timing::Metrical(480.into()));
        assert_eq!(smf.tracks.len(), 1);
    }

    #[test]
    fn tempo_meta_event_matches_sequence_qpm() {
        let bytes = sequence_to_midi_bytes(&two_note_sequence()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        // 80 QPM is 750_000 microseconds per quarter note.
        assert_eq!(
            smf.tracks[0][0].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(750_000.into()))
        );
    }

    #[test]
    fn empty_tempo_list_falls_back_to_120_qpm() {
        let mut sequence = two_note_sequence();
        sequence.tempos.clear();
        let bytes = sequence_to_midi_bytes(&sequence).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(
            smf.tracks[0][0].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(500_000.into()))
        );
    }

    #[test]
    fn note_events_are_delta_encoded_at_step_resolution() {
        let bytes = sequence_to_midi_bytes(&two_note_sequence()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let track = &smf.tracks[0];

        // Tempo, on(60), off(60), on(64), off(64), end of track. Two steps at
        // four steps per quarter and 480 ticks per beat is 240 ticks.
        assert_eq!(track.len(), 6);
        assert_eq!(track[1].delta.as_int(), 0);
        assert_eq!(track[2].delta.as_int(), 240);
        assert_eq!(track[3].delta.as_int(), 0);
        assert_eq!(track[4].delta.as_int(), 240);

        match track[2].kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOff { key, .. },
                ..
            } => assert_eq!(key, u7::new(60)),
            ref other => panic!("expected NoteOff, got {other:?}"),
        }
        match track[3].kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, .. },
                ..
            } => assert_eq!(key, u7::new(64)),
            ref other => panic!("expected NoteOn, got {other:?}"),
        }
    }

    #[test]
    fn zero_steps_per_quarter_falls_back_to_the_default_resolution() {
        let mut sequence = two_note_sequence();
        sequence.set_steps_per_quarter(0);
        let bytes = sequence_to_midi_bytes(&sequence).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        // Serialized as if quantized at 4 steps per quarter: 2 steps = 240 ticks.
        assert_eq!(smf.tracks[0][2].delta.as_int(), 240);
    }

    #[test]
    fn all_events_use_the_note_instrument_channel() {
        let mut sequence = two_note_sequence();
        sequence.force_instrument(0);
        let bytes = sequence_to_midi_bytes(&sequence).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        for event in &smf.tracks[0] {
            if let TrackEventKind::Midi { channel, .. } = event.kind {
                assert_eq!(channel.as_int(), 0);
            }
        }
    }
}
