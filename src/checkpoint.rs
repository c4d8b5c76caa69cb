use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::constants::{
    CACHE_DIR_NAME, CHECKPOINT_DECODER_FILE, CHECKPOINT_MANIFEST_FILE, NUM_STEPS, VOCAB_SIZE,
    Z_DIMS,
};
use crate::error::GenerateError;

/// Dimension manifest served alongside the decoder, `config.json` in the
/// checkpoint directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointManifest {
    #[serde(rename = "type")]
    pub model_type: String,
    pub z_dims: usize,
    pub num_steps: usize,
    pub vocab_size: usize,
}

/// A checkpoint resolved to local files, ready to back a decoder session.
#[derive(Debug)]
pub struct Checkpoint {
    pub manifest: CheckpointManifest,
    pub decoder_path: PathBuf,
}

fn checkpoint_name(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("checkpoint")
}

fn cache_dir_for(url: &str) -> Result<PathBuf, GenerateError> {
    let base = dirs::cache_dir().ok_or(GenerateError::NoCacheDir)?;
    Ok(base.join(CACHE_DIR_NAME).join(checkpoint_name(url)))
}

// A cached file is only trusted once it is complete; partial downloads live
// at a scratch path until renamed into place.
fn is_cached(path: &Path) -> bool {
    fs::metadata(path).map(|meta| meta.len() > 0).unwrap_or(false)
}

fn fetch_file(url: &str, file: &str, dest: &Path) -> Result<(), GenerateError> {
    let file_url = format!("{}/{}", url.trim_end_matches('/'), file);
    info!(url = %file_url, "downloading checkpoint file");

    let response =
        ureq::get(&file_url)
            .call()
            .map_err(|source| GenerateError::CheckpointFetch {
                url: url.to_owned(),
                file: file.to_owned(),
                source: Box::new(source),
            })?;

    let partial_path = dest.with_extension("partial");
    let mut out = File::create(&partial_path)?;
    if let Err(source) = io::copy(&mut response.into_reader(), &mut out) {
        drop(out);
        let _ = fs::remove_file(&partial_path);
        return Err(source.into());
    }
    out.sync_all()?;
    drop(out);
    fs::rename(&partial_path, dest)?;
    Ok(())
}

/// Resolve the checkpoint at `url`, downloading its files into the per-user
/// cache directory unless they are already present.
pub fn fetch(url: &str) -> Result<Checkpoint, GenerateError> {
    let dir = cache_dir_for(url)?;
    fs::create_dir_all(&dir)?;

    let manifest_path = dir.join(CHECKPOINT_MANIFEST_FILE);
    let decoder_path = dir.join(CHECKPOINT_DECODER_FILE);

    for (file, path) in [
        (CHECKPOINT_MANIFEST_FILE, &manifest_path),
        (CHECKPOINT_DECODER_FILE, &decoder_path),
    ] {
        if is_cached(path) {
            debug!(file, path = %path.display(), "checkpoint file already cached");
        } else {
            fetch_file(url, file, path)?;
        }
    }

    let manifest: CheckpointManifest = serde_json::from_str(&fs::read_to_string(&manifest_path)?)?;
    if manifest.z_dims != Z_DIMS
        || manifest.num_steps != NUM_STEPS
        || manifest.vocab_size != VOCAB_SIZE
    {
        return Err(GenerateError::CheckpointDimensions {
            z_dims: manifest.z_dims,
            num_steps: manifest.num_steps,
            vocab_size: manifest.vocab_size,
        });
    }

    Ok(Checkpoint {
        manifest,
        decoder_path,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn manifest_parses_camel_case_fields() {
        let manifest: CheckpointManifest = serde_json::from_str(
            r#"{"type": "melody_vae", "zDims": 256, "numSteps": 32, "vocabSize": 90}"#,
        )
        .unwrap();
        assert_eq!(
            manifest,
            CheckpointManifest {
                model_type: "melody_vae".to_owned(),
                z_dims: 256,
                num_steps: 32,
                vocab_size: 90,
            }
        );
    }

    #[test]
    fn empty_cached_decoder_is_refetched_not_trusted() {
        let tmp = mktemp::Temp::new_dir().unwrap();
        let tmp_dir: &Path = tmp.as_ref();
        std::env::set_var("XDG_CACHE_HOME", tmp_dir);

        // Unreachable host, so any re-download attempt fails fast.
        let url = "http://127.0.0.1:1/checkpoints/mel_2bar_small";
        let dir = cache_dir_for(url).unwrap();
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(CHECKPOINT_MANIFEST_FILE),
            r#"{"type": "melody_vae", "zDims": 256, "numSteps": 32, "vocabSize": 90}"#,
        )
        .unwrap();
        // A truncated download from an interrupted run.
        fs::write(dir.join(CHECKPOINT_DECODER_FILE), b"").unwrap();

        let result = fetch(url);
        assert!(matches!(
            result,
            Err(GenerateError::CheckpointFetch { ref file, .. })
                if file.as_str() == CHECKPOINT_DECODER_FILE
        ));
        // The truncated file is still empty; nothing pretended to complete it.
        let decoder_len = fs::metadata(dir.join(CHECKPOINT_DECODER_FILE)).unwrap().len();
        assert_eq!(decoder_len, 0);
    }

    #[test]
    fn zero_byte_files_do_not_count_as_cached() {
        let tmp = mktemp::Temp::new_dir().unwrap();
        let tmp_dir: &Path = tmp.as_ref();
        let empty = tmp_dir.join("decoder.onnx");
        fs::write(&empty, b"").unwrap();
        assert!(!is_cached(&empty));
        let full = tmp_dir.join("config.json");
        fs::write(&full, b"{}").unwrap();
        assert!(is_cached(&full));
        assert!(!is_cached(&tmp_dir.join("missing.onnx")));
    }

    #[test]
    fn checkpoint_name_is_the_last_url_segment() {
        assert_eq!(
            checkpoint_name("https://example.com/checkpoints/mel_2bar_small"),
            "mel_2bar_small"
        );
        assert_eq!(
            checkpoint_name("https://example.com/checkpoints/mel_2bar_small/"),
            "mel_2bar_small"
        );
    }
}
