// Core types and error taxonomy for notescope
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Candidate topics used when neither the config nor the caller supplies any.
pub const STANDARD_TOPICS: [&str; 10] = [
    "Mathematics",
    "Economics",
    "Computer Science",
    "History",
    "Physics",
    "Chemistry",
    "Biology",
    "Literature",
    "Business",
    "Psychology",
];

/// A user-supplied file for one analysis run. Never persisted.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Arc<[u8]>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Text pulled from the leading pages of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub pages_processed: usize,
    pub total_pages: usize,
}

impl ExtractedText {
    /// Length in characters, which is what the minimum-text gate measures.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Ordered, de-duplicated, non-empty set of topic names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CandidateLabels(Vec<String>);

impl CandidateLabels {
    pub fn new<I, S>(labels: I) -> Result<Self, ClassificationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into().trim().to_string();
            if label.is_empty() {
                return Err(ClassificationError::BlankLabel);
            }
            if !out.contains(&label) {
                out.push(label);
            }
        }
        if out.is_empty() {
            return Err(ClassificationError::NoCandidateLabels);
        }
        Ok(Self(out))
    }

    pub fn standard() -> Self {
        Self(STANDARD_TOPICS.iter().map(|s| s.to_string()).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for CandidateLabels {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<String>> for CandidateLabels {
    type Error = ClassificationError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<CandidateLabels> for Vec<String> {
    fn from(labels: CandidateLabels) -> Self {
        labels.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Scores for every candidate label, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub top_topic: String,
    pub confidence: f32,
    pub all_scores: Vec<LabelScore>,
}

impl ClassificationResult {
    /// Build from label scores in any order. Returns `None` for an empty list.
    pub fn from_scores(mut scores: Vec<LabelScore>) -> Option<Self> {
        // stable: ties keep candidate order
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        let top = scores.first()?;
        Some(Self {
            top_topic: top.label.clone(),
            confidence: top.score,
            all_scores: scores,
        })
    }

    pub fn score_for(&self, label: &str) -> Option<f32> {
        self.all_scores
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.score)
    }
}

/// What a finished analysis hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub document: String,
    pub classification: ClassificationResult,
    pub word_count: usize,
    pub text_chars: usize,
    pub pages_processed: usize,
    pub total_pages: usize,
}

// Pipeline stage that hit its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    ModelLoad,
    Inference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ModelLoad => write!(f, "model load"),
            Stage::Inference => write!(f, "inference"),
        }
    }
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum DocumentParseError {
    #[error("not a readable PDF: {0}")]
    Malformed(String),

    #[error("PDF is encrypted")]
    Encrypted,

    #[error("failed to read text from page {page}: {reason}")]
    Page { page: u32, reason: String },

    #[error("PDF parser stopped unexpectedly: {0}")]
    Worker(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to download {file}: {reason}")]
    Download { file: String, reason: String },

    #[error("model cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model file missing: {0}")]
    MissingFile(String),

    #[error("invalid model config: {0}")]
    Config(String),

    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),

    #[error("inference runtime error: {0}")]
    Runtime(String),
}

// io::Error is not Clone; keep its kind and message
impl Clone for ModelLoadError {
    fn clone(&self) -> Self {
        match self {
            ModelLoadError::Download { file, reason } => ModelLoadError::Download {
                file: file.clone(),
                reason: reason.clone(),
            },
            ModelLoadError::Io(e) => {
                ModelLoadError::Io(std::io::Error::new(e.kind(), e.to_string()))
            }
            ModelLoadError::MissingFile(f) => ModelLoadError::MissingFile(f.clone()),
            ModelLoadError::Config(m) => ModelLoadError::Config(m.clone()),
            ModelLoadError::Tokenizer(m) => ModelLoadError::Tokenizer(m.clone()),
            ModelLoadError::Runtime(m) => ModelLoadError::Runtime(m.clone()),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassificationError {
    #[error("no candidate labels")]
    NoCandidateLabels,

    #[error("candidate labels must not be blank")]
    BlankLabel,

    #[error("nothing to classify")]
    EmptyInput,

    #[error("model returned {got} scores for {expected} labels")]
    ScoreCountMismatch { expected: usize, got: usize },

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Failure of a single `detect_topic` call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TopicError {
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
}

/// Failure of a whole analysis run, as seen by the UI layer.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("an analysis is already running")]
    Busy,

    #[error("could not read this file: {0}")]
    Parse(#[from] DocumentParseError),

    #[error("could not extract enough text ({chars} of {min} characters). Is this a scanned PDF?")]
    InsufficientText { chars: usize, min: usize },

    #[error("AI model unavailable: {0}")]
    ModelLoad(ModelLoadError),

    #[error("topic detection failed: {0}")]
    Classification(ClassificationError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
}

impl From<TopicError> for AnalysisError {
    fn from(err: TopicError) -> Self {
        match err {
            TopicError::ModelLoad(e) => AnalysisError::ModelLoad(e),
            TopicError::Classification(e) => AnalysisError::Classification(e),
            TopicError::Timeout { stage, after } => AnalysisError::Timeout { stage, after },
        }
    }
}

impl AnalysisError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AnalysisError::Busy => FailureKind::Busy,
            AnalysisError::Parse(_) => FailureKind::UnreadableFile,
            AnalysisError::InsufficientText { .. } => FailureKind::InsufficientText,
            AnalysisError::ModelLoad(_) => FailureKind::ModelUnavailable,
            AnalysisError::Classification(_) => FailureKind::ClassificationFailed,
            AnalysisError::Timeout { .. } => FailureKind::TimedOut,
        }
    }
}

/// Coarse failure category the UI uses to pick a message and offer a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Busy,
    UnreadableFile,
    InsufficientText,
    ModelUnavailable,
    ClassificationFailed,
    TimedOut,
}

impl FailureKind {
    /// Retrying the same file can help (transient), as opposed to the file being unsuitable.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FailureKind::Busy | FailureKind::ModelUnavailable | FailureKind::TimedOut
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_labels_trim_and_dedup() {
        let labels = CandidateLabels::new(["  Physics", "Physics", "History "]).unwrap();
        assert_eq!(labels.as_slice(), &["Physics".to_string(), "History".to_string()]);
    }

    #[test]
    fn candidate_labels_reject_empty_and_blank() {
        assert!(matches!(
            CandidateLabels::new(Vec::<String>::new()),
            Err(ClassificationError::NoCandidateLabels)
        ));
        assert!(matches!(
            CandidateLabels::new(["Physics", "   "]),
            Err(ClassificationError::BlankLabel)
        ));
    }

    #[test]
    fn standard_labels_keep_order() {
        let labels = CandidateLabels::standard();
        assert_eq!(labels.len(), 10);
        assert_eq!(labels.iter().next(), Some("Mathematics"));
        assert_eq!(labels.iter().last(), Some("Psychology"));
    }

    #[test]
    fn from_scores_sorts_descending_and_keeps_ties_in_order() {
        let result = ClassificationResult::from_scores(vec![
            LabelScore { label: "A".into(), score: 0.2 },
            LabelScore { label: "B".into(), score: 0.4 },
            LabelScore { label: "C".into(), score: 0.4 },
        ])
        .unwrap();

        let order: Vec<&str> = result.all_scores.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
        assert_eq!(result.top_topic, "B");
        assert_eq!(result.confidence, 0.4);
        assert!(ClassificationResult::from_scores(vec![]).is_none());
    }

    #[test]
    fn retryable_failures() {
        assert!(FailureKind::ModelUnavailable.is_retryable());
        assert!(FailureKind::TimedOut.is_retryable());
        assert!(!FailureKind::InsufficientText.is_retryable());
        assert!(!FailureKind::UnreadableFile.is_retryable());
        assert!(!FailureKind::ClassificationFailed.is_retryable());
    }

    #[test]
    fn extracted_text_counts() {
        let text = ExtractedText {
            text: "supply and   demand".into(),
            pages_processed: 1,
            total_pages: 1,
        };
        assert_eq!(text.word_count(), 3);
        assert_eq!(text.char_count(), 19);
    }
}
