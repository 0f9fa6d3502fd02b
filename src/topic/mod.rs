// Zero-shot topic detection
// The classifier asks an entailment model how strongly a short excerpt entails
// "This example is {label}." per label; the model is loaded once per provider.
use async_trait::async_trait;

use crate::types::{CandidateLabels, ClassificationError, ClassificationResult, TopicError};

pub mod classifier;
pub mod model_cache;
pub mod model_provider;
pub mod onnx_model;
pub mod tokenizer;

pub use classifier::{softmax, truncate_chars, TopicClassifier};
pub use model_cache::{ModelFiles, REQUIRED_FILES};
pub use model_provider::{HubModelLoader, ModelLoader, ModelProvider};
pub use onnx_model::OnnxZeroShotModel;

/// A loaded NLI model, ready to score premise/hypothesis pairs.
pub trait EntailmentModel: Send + Sync {
    /// One raw entailment logit per hypothesis, in input order.
    fn entailment_logits(
        &self,
        premise: &str,
        hypotheses: &[String],
    ) -> Result<Vec<f32>, ClassificationError>;
}

/// Scores text against candidate topics.
#[async_trait]
pub trait TopicDetector: Send + Sync {
    /// `labels = None` uses the detector's configured label set.
    async fn detect_topic(
        &self,
        text: &str,
        labels: Option<&CandidateLabels>,
    ) -> Result<ClassificationResult, TopicError>;
}
