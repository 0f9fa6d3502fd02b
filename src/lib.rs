// notescope - local PDF text extraction and zero-shot topic detection
pub mod config;
pub mod orchestrator;
pub mod pdf_extraction;
pub mod topic;
pub mod types;

pub use config::{AnalyzerConfig, ConfigError};
pub use orchestrator::{AnalysisOrchestrator, AnalysisState, ProgressEvent};
pub use pdf_extraction::{LopdfExtractor, TextExtractor};
pub use topic::{
    EntailmentModel, HubModelLoader, ModelLoader, ModelProvider, TopicClassifier, TopicDetector,
};
pub use types::{
    AnalysisError, AnalysisReport, CandidateLabels, ClassificationResult, ExtractedText,
    FailureKind, LabelScore, UploadedDocument, STANDARD_TOPICS,
};

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "notescope=info"
}
