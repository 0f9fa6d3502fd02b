// Extraction -> classification sequencing with progress states
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::config::{AnalyzerConfig, ConfigError};
use crate::pdf_extraction::{LopdfExtractor, TextExtractor};
use crate::topic::{ModelProvider, TopicClassifier, TopicDetector};
use crate::types::{AnalysisError, AnalysisReport, CandidateLabels, FailureKind, UploadedDocument};

pub const EXTRACTING_MESSAGE: &str = "Extracting text from PDF (Local)...";
pub const CLASSIFYING_MESSAGE: &str = "Loading AI Model & Detecting Topic...";
pub const DONE_MESSAGE: &str = "Analysis complete";

/// Where an analysis run currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisState {
    #[default]
    Idle,
    Extracting,
    Classifying,
    Done,
    Failed(FailureKind),
}

impl AnalysisState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisState::Done | AnalysisState::Failed(_))
    }
}

/// One state transition, with the line the UI should show for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub state: AnalysisState,
    pub message: String,
}

pub struct AnalysisOrchestrator {
    extractor: Arc<dyn TextExtractor>,
    detector: Arc<dyn TopicDetector>,
    labels: Option<CandidateLabels>,
    min_text_chars: usize,
    state: Mutex<AnalysisState>,
    running: AtomicBool,
    progress: Mutex<Option<mpsc::UnboundedSender<ProgressEvent>>>,
}

// Clears the in-flight flag however the run ends
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AnalysisOrchestrator {
    pub fn new(extractor: Arc<dyn TextExtractor>, detector: Arc<dyn TopicDetector>) -> Self {
        Self {
            extractor,
            detector,
            labels: None,
            min_text_chars: 50,
            state: Mutex::new(AnalysisState::Idle),
            running: AtomicBool::new(false),
            progress: Mutex::new(None),
        }
    }

    /// Wire the lopdf extractor and ONNX classifier around a shared model provider.
    pub fn from_config(
        config: &AnalyzerConfig,
        provider: Arc<ModelProvider>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier = TopicClassifier::from_config(
            provider,
            &config.classifier,
            config.model.inference_timeout(),
        )
        .map_err(|e| ConfigError::Invalid {
            field: "classifier.labels",
            reason: e.to_string(),
        })?;

        Ok(Self::new(
            Arc::new(LopdfExtractor::new(config.extraction.max_pages)),
            Arc::new(classifier),
        )
        .with_min_text_chars(config.extraction.min_text_chars))
    }

    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    /// Score against these labels instead of the detector's own set.
    pub fn with_labels(mut self, labels: CandidateLabels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn state(&self) -> AnalysisState {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }

    /// Receive every state transition from now on. Replaces any earlier subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut progress) = self.progress.lock() {
            *progress = Some(tx);
        }
        rx
    }

    /// Run one analysis. Rejected with [`AnalysisError::Busy`] while another is in flight.
    pub async fn analyze(
        &self,
        document: UploadedDocument,
    ) -> Result<AnalysisReport, AnalysisError> {
        if self.running.swap(true, Ordering::AcqRel) {
            tracing::warn!(document = %document.name, "analysis rejected, another is running");
            return Err(AnalysisError::Busy);
        }
        let _guard = RunGuard(&self.running);

        // Idle carries no message, the UI just clears the previous result
        self.transition(AnalysisState::Idle, "");
        tracing::info!(document = %document.name, bytes = document.len(), "starting analysis");

        self.transition(AnalysisState::Extracting, EXTRACTING_MESSAGE);
        let extracted = match self.extractor.extract_text(&document).await {
            Ok(extracted) => extracted,
            Err(e) => return Err(self.fail(e.into())),
        };
        let chars = extracted.char_count();
        if chars < self.min_text_chars {
            return Err(self.fail(AnalysisError::InsufficientText {
                chars,
                min: self.min_text_chars,
            }));
        }

        self.transition(AnalysisState::Classifying, CLASSIFYING_MESSAGE);
        let classification = match self
            .detector
            .detect_topic(&extracted.text, self.labels.as_ref())
            .await
        {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e.into())),
        };

        let report = AnalysisReport {
            document: document.name,
            word_count: extracted.word_count(),
            text_chars: chars,
            pages_processed: extracted.pages_processed,
            total_pages: extracted.total_pages,
            classification,
        };
        self.transition(AnalysisState::Done, DONE_MESSAGE);
        tracing::info!(
            document = %report.document,
            topic = %report.classification.top_topic,
            confidence = report.classification.confidence,
            words = report.word_count,
            "analysis complete"
        );
        Ok(report)
    }

    fn fail(&self, err: AnalysisError) -> AnalysisError {
        let kind = err.kind();
        tracing::warn!(error = %err, retryable = kind.is_retryable(), "analysis failed");
        self.transition(AnalysisState::Failed(kind), &err.to_string());
        err
    }

    fn set_state(&self, state: AnalysisState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    fn transition(&self, state: AnalysisState, message: &str) {
        self.set_state(state);
        tracing::debug!(?state, message, "analysis state");
        if let Ok(progress) = self.progress.lock() {
            if let Some(tx) = progress.as_ref() {
                // receiver gone just means nobody is watching
                let _ = tx.send(ProgressEvent {
                    state,
                    message: message.to_string(),
                });
            }
        }
    }
}
