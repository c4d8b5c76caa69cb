use ndarray::{Array2, Array3, Ix3};
use ort::{GraphOptimizationLevel, Session, Tensor};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::checkpoint::Checkpoint;
use crate::constants::{NUM_STEPS, VOCAB_SIZE, Z_DIMS};
use crate::error::GenerateError;
use crate::sequence::NoteSequence;

const LOGITS_OUTPUT: &str = "logits";

/// Pretrained melody-VAE decoder backed by an ONNX session.
pub struct MelodyVae {
    session: Session,
}

impl MelodyVae {
    /// Load the decoder from a resolved checkpoint. This is the expensive step:
    /// the session maps the full weight file.
    pub fn initialize(checkpoint: &Checkpoint) -> Result<Self, GenerateError> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&checkpoint.decoder_path)?;
        Ok(MelodyVae { session })
    }

    /// Sample `n` melodies at the given softmax temperature.
    ///
    /// Latent vectors are drawn from the standard normal; temperature only
    /// shapes the per-step categorical sampling of the decoder's logits.
    pub fn sample<R: Rng>(
        &self,
        n: usize,
        temperature: f32,
        rng: &mut R,
    ) -> Result<Vec<NoteSequence>, GenerateError> {
        let z = draw_latents(n, &mut *rng);
        let logits = self.decode(z)?;

        let mut sequences = Vec::with_capacity(n);
        for sequence_logits in logits.outer_iter() {
            let labels: Vec<usize> = sequence_logits
                .outer_iter()
                .map(|step_logits| sample_categorical(&step_logits.to_vec(), temperature, &mut *rng))
                .collect();
            sequences.push(NoteSequence::from_labels(&labels));
        }

        Ok(sequences)
    }

    fn decode(&self, z: Array2<f32>) -> Result<Array3<f32>, GenerateError> {
        let n = z.shape()[0];
        let input_shape: Vec<i64> = z.shape().iter().map(|&dim| dim as i64).collect();
        let input_data: Vec<f32> = z.into_raw_vec();
        let input_tensor = Tensor::from_array((input_shape, input_data))?;

        let outputs = self.session.run(ort::inputs![input_tensor]?)?;

        let mut logits: Option<Array3<f32>> = None;
        for (&key, value) in outputs.iter() {
            if key == LOGITS_OUTPUT {
                let view = value.try_extract_tensor::<f32>()?;
                let view_shape = view.shape().to_vec();
                logits = Some(
                    view.into_dimensionality::<Ix3>()
                        .map_err(|_| GenerateError::OutputShape { shape: view_shape })?
                        .to_owned(),
                );
            }
        }
        let logits = logits.ok_or(GenerateError::MissingOutput(LOGITS_OUTPUT))?;

        let shape = logits.shape().to_vec();
        if shape != [n, NUM_STEPS, VOCAB_SIZE] {
            return Err(GenerateError::OutputShape { shape });
        }
        debug!(n, "decoded logits");

        Ok(logits)
    }
}

fn draw_latents<R: Rng>(n: usize, rng: &mut R) -> Array2<f32> {
    Array2::from_shape_simple_fn((n, Z_DIMS), || rng.sample(StandardNormal))
}

/// Sample one label from unnormalized logits at the given softmax temperature.
pub fn sample_categorical<R: Rng>(logits: &[f32], temperature: f32, rng: &mut R) -> usize {
    let scale = 1.0 / temperature.max(f32::EPSILON);
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let weights: Vec<f32> = logits.iter().map(|&l| ((l - max) * scale).exp()).collect();
    let total: f32 = weights.iter().sum();

    let mut threshold = rng.gen::<f32>() * total;
    for (label, &weight) in weights.iter().enumerate() {
        threshold -= weight;
        if threshold <= 0.0 {
            return label;
        }
    }
    weights.len().saturating_sub(1)
}
