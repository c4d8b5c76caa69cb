use std::path::PathBuf;

use crate::constants::{
    BASE_QPM, DEFAULT_INTENSITY, MAX_TEMPERATURE, MIN_TEMPERATURE, QPM_PER_INTENSITY,
};

/// Chord label associated with an emotion. Unknown labels fall back to "C major".
///
/// The chord is carried for documentation and logging only; it is never fed to
/// the model.
pub fn chord_for_emotion(emotion: &str) -> &'static str {
    match emotion {
        "colère" => "C minor",
        "tristesse" => "A minor",
        "peur" => "D minor",
        "joie" => "C major",
        "doute" => "E minor",
        "nostalgie" => "F major",
        _ => "C major",
    }
}

/// Parse an intensity argument, defaulting to 1.0 when the value is absent,
/// non-numeric, or non-finite.
pub fn parse_intensity(raw: Option<&str>) -> f32 {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(DEFAULT_INTENSITY)
}

/// Per-invocation generation parameters, derived once from the CLI arguments
/// and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub output_path: PathBuf,
    pub emotion: String,
    pub intensity: f32,
    pub chord: &'static str,
    pub temperature: f32,
    pub tempo_qpm: f32,
}

impl GenerationParams {
    /// Derive sampling parameters from the raw arguments.
    ///
    /// Temperature is the intensity clamped into [0.1, 2.0]. The tempo uses the
    /// raw, unclamped intensity (60 + 40 per unit), so intensities outside the
    /// clamp range still move the tempo past the nominal 60-140 QPM band. That
    /// asymmetry is longstanding observable behavior and is kept as is.
    pub fn derive(output_path: PathBuf, emotion: &str, intensity_raw: Option<&str>) -> Self {
        let intensity = parse_intensity(intensity_raw);
        GenerationParams {
            output_path,
            emotion: emotion.to_owned(),
            intensity,
            chord: chord_for_emotion(emotion),
            temperature: intensity.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE),
            tempo_qpm: BASE_QPM + intensity * QPM_PER_INTENSITY,
        }
    }
}
