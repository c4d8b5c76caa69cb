//! Emotion-conditioned melody generation.
//!
//! Maps an emotion label and intensity to sampling parameters, draws one
//! melody from a pretrained melody-VAE decoder, and serializes it as a
//! Standard MIDI File.

pub mod checkpoint;
pub mod constants;
pub mod emotion;
pub mod error;
pub mod midi;
pub mod model;
pub mod sequence;

pub use emotion::GenerationParams;
pub use error::GenerateError;
pub use sequence::NoteSequence;
