use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use emovae::checkpoint;
use emovae::constants::{CHECKPOINT_URL, DEFAULT_EMOTION, STEPS_PER_QUARTER};
use emovae::midi::sequence_to_midi_bytes;
use emovae::model::MelodyVae;
use emovae::{GenerateError, GenerationParams};

#[derive(Debug, Parser)]
#[command(
    name = "emovae",
    version,
    about = "Sample an emotion-conditioned melody from a pretrained model and write it as MIDI."
)]
struct Cli {
    /// Output .mid path (overwritten if it exists).
    output: PathBuf,

    /// Emotion label: colère, tristesse, peur, joie, doute or nostalgie.
    #[arg(default_value = DEFAULT_EMOTION)]
    emotion: String,

    /// Emotional intensity; absent or non-numeric values fall back to 1.0.
    intensity: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(Cli::parse()) {
        error!("generation failed: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let params = GenerationParams::derive(cli.output, &cli.emotion, cli.intensity.as_deref());
    info!(
        emotion = %params.emotion,
        // The chord is documentation only; it never reaches the model.
        chord = params.chord,
        temperature = params.temperature,
        tempo_qpm = params.tempo_qpm,
        "derived generation parameters"
    );

    let checkpoint =
        checkpoint::fetch(CHECKPOINT_URL).context("failed to resolve the model checkpoint")?;
    let model = MelodyVae::initialize(&checkpoint).context("failed to initialize the decoder")?;

    let mut rng = SmallRng::from_entropy();
    let mut sequences = model.sample(1, params.temperature, &mut rng)?;
    if sequences.is_empty() {
        return Err(GenerateError::EmptySample.into());
    }
    let mut sequence = sequences.remove(0);

    sequence.set_tempo(params.tempo_qpm);
    sequence.set_steps_per_quarter(STEPS_PER_QUARTER);
    sequence.force_instrument(0);

    let bytes = sequence_to_midi_bytes(&sequence)?;
    fs::write(&params.output_path, &bytes).map_err(|source| GenerateError::Write {
        path: params.output_path.clone(),
        source,
    })?;
    info!(
        path = %params.output_path.display(),
        bytes = bytes.len(),
        "wrote MIDI file"
    );

    Ok(())
}
