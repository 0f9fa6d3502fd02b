// On-disk model cache with one-time download
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::ModelConfig;
use crate::types::ModelLoadError;

/// Files the zero-shot model needs besides the ONNX graph.
pub const REQUIRED_FILES: [&str; 2] = ["config.json", "tokenizer.json"];

/// Resolved local paths of a complete model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub dir: PathBuf,
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub onnx: PathBuf,
}

impl ModelFiles {
    pub fn in_dir(dir: &Path, onnx_file: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            onnx: dir.join(onnx_file),
        }
    }

    /// Relative names paired with where they live, in download order.
    fn entries<'a>(&'a self, onnx_file: &'a str) -> [(&'a str, &'a Path); 3] {
        [
            (REQUIRED_FILES[0], self.config.as_path()),
            (REQUIRED_FILES[1], self.tokenizer.as_path()),
            (onnx_file, self.onnx.as_path()),
        ]
    }

    pub fn missing(&self, onnx_file: &str) -> Vec<String> {
        self.entries(onnx_file)
            .iter()
            .filter(|(_, path)| !path.is_file())
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

pub fn file_url(config: &ModelConfig, file: &str) -> String {
    format!(
        "{}/{}/resolve/{}/{}",
        config.hub_url.trim_end_matches('/'),
        config.repo,
        config.revision,
        file
    )
}

/// Return the model's files, fetching any that are not cached yet.
pub async fn ensure_model_files(config: &ModelConfig) -> Result<ModelFiles, ModelLoadError> {
    let files = ModelFiles::in_dir(&config.model_dir(), &config.onnx_file);
    let missing = files.missing(&config.onnx_file);
    if missing.is_empty() {
        tracing::debug!(dir = %files.dir.display(), "model cache hit");
        return Ok(files);
    }
    if !config.allows_download() {
        return Err(ModelLoadError::MissingFile(
            files.dir.join(&missing[0]).display().to_string(),
        ));
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("notescope/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ModelLoadError::Download {
            file: missing[0].clone(),
            reason: e.to_string(),
        })?;

    for name in &missing {
        let target = files.dir.join(name);
        download_file(&client, &file_url(config, name), name, &target).await?;
    }
    Ok(files)
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    name: &str,
    target: &Path,
) -> Result<(), ModelLoadError> {
    let download_err = |reason: String| ModelLoadError::Download {
        file: name.to_string(),
        reason,
    };

    tracing::info!(%url, "downloading model file");
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| download_err(e.to_string()))?;
    let body = response
        .bytes()
        .await
        .map_err(|e| download_err(e.to_string()))?;

    let parent = target
        .parent()
        .ok_or_else(|| download_err("target has no parent directory".into()))?;
    std::fs::create_dir_all(parent)?;

    // write next to the target and rename, so a partial file is never cached
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&body)?;
    tmp.persist(target).map_err(|e| ModelLoadError::Io(e.error))?;

    tracing::info!(file = name, bytes = body.len(), "cached model file");
    Ok(())
}
