// Zero-shot topic scoring over candidate labels
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::model_provider::ModelProvider;
use super::TopicDetector;
use crate::config::ClassifierConfig;
use crate::types::{
    CandidateLabels, ClassificationError, ClassificationResult, LabelScore, Stage, TopicError,
};

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Numerically stable softmax. Empty in, empty out.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

pub struct TopicClassifier {
    provider: Arc<ModelProvider>,
    labels: CandidateLabels,
    max_input_chars: usize,
    hypothesis_template: String,
    inference_timeout: Duration,
}

impl TopicClassifier {
    pub fn new(provider: Arc<ModelProvider>, labels: CandidateLabels) -> Self {
        let defaults = ClassifierConfig::default();
        Self {
            provider,
            labels,
            max_input_chars: defaults.max_input_chars,
            hypothesis_template: defaults.hypothesis_template,
            inference_timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(
        provider: Arc<ModelProvider>,
        config: &ClassifierConfig,
        inference_timeout: Duration,
    ) -> Result<Self, ClassificationError> {
        Ok(Self {
            provider,
            labels: CandidateLabels::new(config.labels.iter().cloned())?,
            max_input_chars: config.max_input_chars,
            hypothesis_template: config.hypothesis_template.clone(),
            inference_timeout,
        })
    }

    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }

    pub fn labels(&self) -> &CandidateLabels {
        &self.labels
    }

    pub fn provider(&self) -> &Arc<ModelProvider> {
        &self.provider
    }

    pub fn hypothesis(&self, label: &str) -> String {
        self.hypothesis_template.replace("{}", label)
    }

    async fn classify(
        &self,
        text: &str,
        labels: &CandidateLabels,
    ) -> Result<ClassificationResult, TopicError> {
        let excerpt = truncate_chars(text.trim(), self.max_input_chars);
        if excerpt.is_empty() {
            return Err(ClassificationError::EmptyInput.into());
        }

        let model = self.provider.get().await?;

        let excerpt_chars = excerpt.chars().count();
        let premise = excerpt.to_string();
        let hypotheses: Vec<String> = labels.iter().map(|l| self.hypothesis(l)).collect();
        let started = Instant::now();

        // inference is CPU-bound, keep it off the async workers
        let inference = tokio::task::spawn_blocking(move || {
            model.entailment_logits(&premise, &hypotheses)
        });
        let logits = match tokio::time::timeout(self.inference_timeout, inference).await {
            Err(_) => {
                return Err(TopicError::Timeout {
                    stage: Stage::Inference,
                    after: self.inference_timeout,
                })
            }
            Ok(joined) => joined.map_err(|e| ClassificationError::Inference(e.to_string()))??,
        };

        if logits.len() != labels.len() {
            return Err(ClassificationError::ScoreCountMismatch {
                expected: labels.len(),
                got: logits.len(),
            }
            .into());
        }
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(
                ClassificationError::Inference("model produced a non-finite logit".into()).into(),
            );
        }

        let scores = labels
            .iter()
            .zip(softmax(&logits))
            .map(|(label, score)| LabelScore {
                label: label.to_string(),
                score,
            })
            .collect();
        let result = ClassificationResult::from_scores(scores)
            .ok_or(ClassificationError::NoCandidateLabels)?;

        tracing::info!(
            top_topic = %result.top_topic,
            confidence = result.confidence,
            excerpt_chars,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "detected topic"
        );
        Ok(result)
    }
}

#[async_trait]
impl TopicDetector for TopicClassifier {
    async fn detect_topic(
        &self,
        text: &str,
        labels: Option<&CandidateLabels>,
    ) -> Result<ClassificationResult, TopicError> {
        let labels = labels.unwrap_or(&self.labels);
        self.classify(text, labels).await
    }
}
