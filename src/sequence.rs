use crate::constants::{
    DEFAULT_VELOCITY, HOLD_LABEL, MIN_MIDI_PITCH, NOTE_OFF_LABEL, PITCH_LABEL_BASE,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    pub instrument: u8,
    pub quantized_start_step: u32,
    pub quantized_end_step: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub qpm: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationInfo {
    pub steps_per_quarter: u32,
}

/// A step-quantized sequence of notes plus tempo and quantization metadata, as
/// produced by the decoder and patched by the pipeline before serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSequence {
    pub notes: Vec<Note>,
    pub tempos: Vec<Tempo>,
    pub quantization: Option<QuantizationInfo>,
    pub total_quantized_steps: u32,
}

impl NoteSequence {
    /// Decode a monophonic melody from per-step labels.
    ///
    /// A hold label extends the open note, a note-off closes it, and a pitch
    /// label closes the open note (if any) and starts a new one. A note still
    /// open at the end of the labels is closed at the final step.
    pub fn from_labels(labels: &[usize]) -> Self {
        let mut notes: Vec<Note> = vec![];
        let mut open: Option<(u8, u32)> = None;

        for (step, &label) in labels.iter().enumerate() {
            let step = step as u32;
            match label {
                HOLD_LABEL => {}
                NOTE_OFF_LABEL => {
                    if let Some((pitch, start)) = open.take() {
                        notes.push(Note {
                            pitch,
                            velocity: DEFAULT_VELOCITY,
                            instrument: 0,
                            quantized_start_step: start,
                            quantized_end_step: step,
                        });
                    }
                }
                _ => {
                    if let Some((pitch, start)) = open.take() {
                        notes.push(Note {
                            pitch,
                            velocity: DEFAULT_VELOCITY,
                            instrument: 0,
                            quantized_start_step: start,
                            quantized_end_step: step,
                        });
                    }
                    let pitch = MIN_MIDI_PITCH + (label - PITCH_LABEL_BASE) as u8;
                    open = Some((pitch, step));
                }
            }
        }

        if let Some((pitch, start)) = open {
            notes.push(Note {
                pitch,
                velocity: DEFAULT_VELOCITY,
                instrument: 0,
                quantized_start_step: start,
                quantized_end_step: labels.len() as u32,
            });
        }

        NoteSequence {
            notes,
            tempos: vec![],
            quantization: None,
            total_quantized_steps: labels.len() as u32,
        }
    }

    /// Replace the tempo list with a single entry.
    pub fn set_tempo(&mut self, qpm: f32) {
        self.tempos = vec![Tempo { qpm }];
    }

    pub fn set_steps_per_quarter(&mut self, steps_per_quarter: u32) {
        self.quantization = Some(QuantizationInfo { steps_per_quarter });
    }

    /// Move every note onto the given instrument index.
    pub fn force_instrument(&mut self, instrument: u8) {
        for note in &mut self.notes {
            note.instrument = instrument;
        }
    }
}
