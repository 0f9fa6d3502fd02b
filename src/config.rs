// Configuration for notescope
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{CandidateLabels, STANDARD_TOPICS};

pub const DEFAULT_CONFIG_FILE: &str = "notescope.toml";
pub const CONFIG_ENV: &str = "NOTESCOPE_CONFIG";
pub const MODEL_DIR_ENV: &str = "NOTESCOPE_MODEL_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            min_text_chars: default_min_text_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_hypothesis_template")]
    pub hypothesis_template: String,
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            hypothesis_template: default_hypothesis_template(),
            labels: default_labels(),
        }
    }
}

impl ClassifierConfig {
    pub fn candidate_labels(&self) -> Result<CandidateLabels, ConfigError> {
        CandidateLabels::new(self.labels.iter().cloned()).map_err(|e| ConfigError::Invalid {
            field: "classifier.labels",
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_revision")]
    pub revision: String,
    #[serde(default = "default_onnx_file")]
    pub onnx_file: String,
    #[serde(default = "default_hub_url")]
    pub hub_url: String,
    /// Where downloaded model files live. `None` means the user cache dir.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// A pre-populated model directory. Disables downloading.
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,
    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            revision: default_revision(),
            onnx_file: default_onnx_file(),
            hub_url: default_hub_url(),
            cache_dir: None,
            local_dir: None,
            intra_threads: default_intra_threads(),
            load_timeout_secs: default_load_timeout_secs(),
            inference_timeout_secs: default_inference_timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    /// Directory holding this model's files, whether or not it exists yet.
    pub fn model_dir(&self) -> PathBuf {
        if let Some(dir) = &self.local_dir {
            return dir.clone();
        }
        let root = self
            .cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("notescope").join("models")))
            .unwrap_or_else(|| PathBuf::from(".notescope-models"));
        root.join(self.repo.replace('/', "--")).join(&self.revision)
    }

    pub fn allows_download(&self) -> bool {
        self.local_dir.is_none()
    }
}

fn default_max_pages() -> usize { 10 }
fn default_min_text_chars() -> usize { 50 }
fn default_max_input_chars() -> usize { 1000 }
fn default_hypothesis_template() -> String { "This example is {}.".to_string() }
fn default_labels() -> Vec<String> { STANDARD_TOPICS.iter().map(|s| s.to_string()).collect() }
fn default_repo() -> String { "Xenova/mobilebert-uncased-mnli".to_string() }
fn default_revision() -> String { "main".to_string() }
fn default_onnx_file() -> String { "onnx/model_quantized.onnx".to_string() }
fn default_hub_url() -> String { "https://huggingface.co".to_string() }
fn default_intra_threads() -> usize { 4 }
fn default_load_timeout_secs() -> u64 { 300 }
fn default_inference_timeout_secs() -> u64 { 60 }

impl AnalyzerConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Explicit path, then `NOTESCOPE_CONFIG`, then `./notescope.toml`, then defaults.
    /// `NOTESCOPE_MODEL_DIR` always wins for the model location.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match env::var_os(CONFIG_ENV) {
                Some(path) => Self::load_from(Path::new(&path))?,
                None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                    Self::load_from(Path::new(DEFAULT_CONFIG_FILE))?
                }
                None => Self::default(),
            },
        };
        if let Some(dir) = env::var_os(MODEL_DIR_ENV) {
            config.model.local_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction.max_pages == 0 {
            return Err(ConfigError::Invalid {
                field: "extraction.max_pages",
                reason: "must be at least 1".into(),
            });
        }
        if self.classifier.max_input_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "classifier.max_input_chars",
                reason: "must be at least 1".into(),
            });
        }
        if !self.classifier.hypothesis_template.contains("{}") {
            return Err(ConfigError::Invalid {
                field: "classifier.hypothesis_template",
                reason: "must contain a {} placeholder".into(),
            });
        }
        if self.model.intra_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "model.intra_threads",
                reason: "must be at least 1".into(),
            });
        }
        self.classifier.candidate_labels()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.extraction.max_pages, 10);
        assert_eq!(config.extraction.min_text_chars, 50);
        assert_eq!(config.classifier.max_input_chars, 1000);
        assert_eq!(config.classifier.labels.len(), 10);
        assert_eq!(config.model.repo, "Xenova/mobilebert-uncased-mnli");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = AnalyzerConfig::from_toml_str(
            r#"
            [extraction]
            max_pages = 3

            [classifier]
            labels = ["Law", "Medicine"]
            "#,
            Path::new("test.toml"),
        )
        .unwrap();

        assert_eq!(config.extraction.max_pages, 3);
        assert_eq!(config.extraction.min_text_chars, 50);
        assert_eq!(config.classifier.labels, vec!["Law", "Medicine"]);
        assert_eq!(config.model.inference_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let err = AnalyzerConfig::from_toml_str(
            "[classifier]\nhypothesis_template = \"About this.\"\n",
            Path::new("test.toml"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "classifier.hypothesis_template", .. }
        ));
    }

    #[test]
    fn rejects_empty_label_list() {
        let err = AnalyzerConfig::from_toml_str("[classifier]\nlabels = []\n", Path::new("t.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "classifier.labels", .. }));
    }

    #[test]
    fn local_dir_disables_download() {
        let mut model = ModelConfig::default();
        assert!(model.allows_download());
        model.local_dir = Some(PathBuf::from("/opt/models/mnli"));
        assert!(!model.allows_download());
        assert_eq!(model.model_dir(), PathBuf::from("/opt/models/mnli"));
    }

    #[test]
    fn cache_dir_layout() {
        let model = ModelConfig {
            cache_dir: Some(PathBuf::from("/tmp/cache")),
            ..ModelConfig::default()
        };
        assert_eq!(
            model.model_dir(),
            PathBuf::from("/tmp/cache/Xenova--mobilebert-uncased-mnli/main")
        );
    }
}
