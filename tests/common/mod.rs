// Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use notescope::pdf_extraction::fixtures;
use notescope::types::{ClassificationError, ModelLoadError};
use notescope::{EntailmentModel, ModelLoader};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn text_pdf(pages: &[Vec<&str>]) -> Vec<u8> {
    fixtures::text_pdf(pages).expect("build text pdf")
}

pub fn encrypted_pdf(pages: &[Vec<&str>]) -> Vec<u8> {
    fixtures::encrypted_pdf(pages).expect("build encrypted pdf")
}

/// Three pages of lecture notes on markets.
pub fn economics_pdf() -> Vec<u8> {
    text_pdf(&[
        vec![
            "Lecture 3: Supply and demand",
            "The demand curve slopes downward while supply slopes upward.",
        ],
        vec![
            "Market equilibrium is where supply meets demand.",
            "A price above equilibrium creates excess supply.",
        ],
        vec![
            "Shifts in demand move the equilibrium price and quantity.",
            "Elasticity of demand measures price sensitivity.",
        ],
    ])
}

/// Stand-in NLI model: the entailment logit for a hypothesis is twice the
/// number of that label's keywords found in the premise.
pub struct KeywordModel {
    keywords: Vec<(&'static str, Vec<&'static str>)>,
    pub calls: AtomicUsize,
    delay: Duration,
    broken: bool,
}

impl KeywordModel {
    pub fn new() -> Self {
        Self {
            keywords: vec![
                ("Economics", vec!["supply", "demand", "equilibrium", "market", "price"]),
                ("Biology", vec!["cell", "protein", "organism", "enzyme"]),
                ("History", vec!["revolution", "empire", "century", "war"]),
                ("Computer Science", vec!["algorithm", "compiler", "memory"]),
            ],
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            broken: false,
        }
    }

    /// Blocks this long on every call.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    /// Every call fails like a runtime error from the inference engine.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::new()
        }
    }
}

impl EntailmentModel for KeywordModel {
    fn entailment_logits(
        &self,
        premise: &str,
        hypotheses: &[String],
    ) -> Result<Vec<f32>, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.broken {
            return Err(ClassificationError::Inference(
                "input tensor shape mismatch".into(),
            ));
        }
        let premise = premise.to_lowercase();
        Ok(hypotheses
            .iter()
            .map(|hypothesis| {
                let hits: usize = self
                    .keywords
                    .iter()
                    .filter(|(label, _)| hypothesis.contains(label))
                    .flat_map(|(_, words)| words.iter())
                    .map(|word| premise.matches(word).count())
                    .sum();
                2.0 * hits as f32
            })
            .collect())
    }
}

/// Hands out one shared model, counting loads. Optionally fails the first load.
pub struct CountingLoader {
    pub model: Arc<KeywordModel>,
    pub loads: AtomicUsize,
    fail_first: bool,
    delay: Duration,
}

impl CountingLoader {
    pub fn new(model: KeywordModel) -> Self {
        Self {
            model: Arc::new(model),
            loads: AtomicUsize::new(0),
            fail_first: false,
            delay: Duration::ZERO,
        }
    }

    pub fn failing_once(mut self) -> Self {
        self.fail_first = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelLoader for CountingLoader {
    async fn load(&self) -> Result<Arc<dyn EntailmentModel>, ModelLoadError> {
        let call = self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail_first && call == 0 {
            return Err(ModelLoadError::Download {
                file: "onnx/model_quantized.onnx".into(),
                reason: "connection reset".into(),
            });
        }
        Ok(self.model.clone())
    }
}
