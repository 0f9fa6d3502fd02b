// NLI pair tokenizer for the zero-shot model
use std::path::Path;
use tokenizers::tokenizer::{Tokenizer, TruncationParams, TruncationStrategy};

use crate::types::{ClassificationError, ModelLoadError};

/// Token ids for one (premise, hypothesis) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEncoding {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl PairEncoding {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

pub struct NliTokenizer {
    tokenizer: Tokenizer,
}

impl NliTokenizer {
    /// Load `tokenizer.json`, truncating only the premise once a pair exceeds `max_length`.
    pub fn from_file(path: &Path, max_length: usize) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::MissingFile(path.display().to_string()));
        }
        let mut tokenizer =
            Tokenizer::from_file(path).map_err(|e| ModelLoadError::Tokenizer(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                strategy: TruncationStrategy::OnlyFirst,
                ..Default::default()
            }))
            .map_err(|e| ModelLoadError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(None);
        Ok(Self { tokenizer })
    }

    pub fn encode_pair(
        &self,
        premise: &str,
        hypothesis: &str,
    ) -> Result<PairEncoding, ClassificationError> {
        let encoding = self
            .tokenizer
            .encode((premise, hypothesis), true)
            .map_err(|e| ClassificationError::Inference(format!("tokenization failed: {e}")))?;

        let widen = |ids: &[u32]| ids.iter().map(|&id| id as i64).collect::<Vec<_>>();
        Ok(PairEncoding {
            input_ids: widen(encoding.get_ids()),
            attention_mask: widen(encoding.get_attention_mask()),
            token_type_ids: widen(encoding.get_type_ids()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokenizer_file_is_a_load_error() {
        let err = NliTokenizer::from_file(Path::new("/nonexistent/tokenizer.json"), 512)
            .err()
            .unwrap();
        assert!(matches!(err, ModelLoadError::MissingFile(_)));
    }
}
