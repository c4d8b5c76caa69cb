use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to fetch `{file}` from checkpoint at {url}")]
    CheckpointFetch {
        url: String,
        file: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("invalid checkpoint manifest")]
    CheckpointManifest(#[from] serde_json::Error),

    #[error(
        "checkpoint reports unsupported dimensions \
         (z_dims={z_dims}, num_steps={num_steps}, vocab_size={vocab_size})"
    )]
    CheckpointDimensions {
        z_dims: usize,
        num_steps: usize,
        vocab_size: usize,
    },

    #[error("no cache directory available for checkpoint storage")]
    NoCacheDir,

    #[error("model inference failed")]
    Inference(#[from] ort::Error),

    #[error("decoder did not produce a `{0}` output")]
    MissingOutput(&'static str),

    #[error("decoder output has unexpected shape {shape:?}")]
    OutputShape { shape: Vec<usize> },

    #[error("model returned no sequences")]
    EmptySample,

    #[error("failed to write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
