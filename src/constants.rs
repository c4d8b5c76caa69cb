// Checkpoint
pub const CHECKPOINT_URL: &str =
    "https://storage.googleapis.com/magentadata/js/checkpoints/music_vae/mel_2bar_small";
pub const CHECKPOINT_MANIFEST_FILE: &str = "config.json";
pub const CHECKPOINT_DECODER_FILE: &str = "decoder.onnx";
pub const CACHE_DIR_NAME: &str = "emovae";

// Model dimensions (2-bar melody decoder)
pub const Z_DIMS: usize = 256;
pub const NUM_STEPS: usize = 32;
pub const VOCAB_SIZE: usize = 90;

// Melody label encoding: 0 holds the open note, 1 releases it,
// 2..VOCAB_SIZE starts a note at MIN_MIDI_PITCH + (label - PITCH_LABEL_BASE).
pub const HOLD_LABEL: usize = 0;
pub const NOTE_OFF_LABEL: usize = 1;
pub const PITCH_LABEL_BASE: usize = 2;
pub const MIN_MIDI_PITCH: u8 = 21;

// Parameter derivation
pub const DEFAULT_EMOTION: &str = "joie";
pub const DEFAULT_INTENSITY: f32 = 1.0;
pub const MIN_TEMPERATURE: f32 = 0.1;
pub const MAX_TEMPERATURE: f32 = 2.0;
pub const BASE_QPM: f32 = 60.0;
pub const QPM_PER_INTENSITY: f32 = 40.0;

// MIDI conversion
pub const TICKS_PER_BEAT: u16 = 480;
pub const STEPS_PER_QUARTER: u32 = 4;
pub const DEFAULT_VELOCITY: u8 = 80;
pub const DEFAULT_QPM: f32 = 120.0;
