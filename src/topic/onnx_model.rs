// Zero-shot NLI model on ONNX Runtime
use ort::{
    inputs,
    session::builder::GraphOptimizationLevel,
    session::Session,
    value::Tensor,
};
use std::path::Path;
use std::sync::Mutex;

use super::model_cache::ModelFiles;
use super::tokenizer::{NliTokenizer, PairEncoding};
use super::EntailmentModel;
use crate::types::{ClassificationError, ModelLoadError};

/// BERT-family encoders take at most this many positions.
pub const MAX_SEQUENCE_LENGTH: usize = 512;

pub struct OnnxZeroShotModel {
    // Session::run needs &mut
    session: Mutex<Session>,
    tokenizer: NliTokenizer,
    entailment_idx: usize,
    num_labels: usize,
    uses_token_type_ids: bool,
}

/// Index of the "entailment" class in a Hugging Face `config.json`.
pub fn entailment_index(config_json: &str) -> Result<(usize, usize), ModelLoadError> {
    let config: serde_json::Value =
        serde_json::from_str(config_json).map_err(|e| ModelLoadError::Config(e.to_string()))?;
    let id2label = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .ok_or_else(|| ModelLoadError::Config("config.json missing id2label mapping".into()))?;

    let entailment_idx = id2label
        .iter()
        .find_map(|(k, v)| {
            let label = v.as_str()?;
            if label.eq_ignore_ascii_case("entailment") {
                k.parse::<usize>().ok()
            } else {
                None
            }
        })
        .ok_or_else(|| {
            ModelLoadError::Config("id2label does not contain an 'entailment' label".into())
        })?;

    if entailment_idx >= id2label.len() {
        return Err(ModelLoadError::Config(format!(
            "entailment index {entailment_idx} outside {} labels",
            id2label.len()
        )));
    }
    Ok((entailment_idx, id2label.len()))
}

impl OnnxZeroShotModel {
    pub fn load(files: &ModelFiles, intra_threads: usize) -> Result<Self, ModelLoadError> {
        let config_json = std::fs::read_to_string(&files.config)?;
        let (entailment_idx, num_labels) = entailment_index(&config_json)?;
        let tokenizer = NliTokenizer::from_file(&files.tokenizer, MAX_SEQUENCE_LENGTH)?;
        let session = build_session(&files.onnx, intra_threads)
            .map_err(|e| ModelLoadError::Runtime(e.to_string()))?;

        let uses_token_type_ids = session.inputs.iter().any(|i| i.name == "token_type_ids");
        tracing::debug!(
            inputs = session.inputs.len(),
            entailment_idx,
            num_labels,
            uses_token_type_ids,
            "onnx session ready"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            entailment_idx,
            num_labels,
            uses_token_type_ids,
        })
    }

    fn pair_logits(&self, encoding: PairEncoding) -> Result<Vec<f32>, ClassificationError> {
        let len = encoding.len();
        let to_tensor = |data: Vec<i64>| {
            Tensor::from_array(([1_usize, len], data.into_boxed_slice()))
                .map_err(|e| ClassificationError::Inference(e.to_string()))
        };
        let input_ids = to_tensor(encoding.input_ids)?;
        let attention_mask = to_tensor(encoding.attention_mask)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassificationError::Inference("model session poisoned".into()))?;
        let outputs = if self.uses_token_type_ids {
            let token_type_ids = to_tensor(encoding.token_type_ids)?;
            session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids
            ])
        } else {
            session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            ])
        }
        .map_err(|e| ClassificationError::Inference(e.to_string()))?;

        let (_shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;
        if logits.len() != self.num_labels {
            return Err(ClassificationError::Inference(format!(
                "expected {} NLI logits, got {}",
                self.num_labels,
                logits.len()
            )));
        }
        Ok(logits.to_vec())
    }
}

fn build_session(path: &Path, intra_threads: usize) -> ort::Result<Session> {
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(path)
}

impl EntailmentModel for OnnxZeroShotModel {
    fn entailment_logits(
        &self,
        premise: &str,
        hypotheses: &[String],
    ) -> Result<Vec<f32>, ClassificationError> {
        hypotheses
            .iter()
            .map(|hypothesis| {
                let encoding = self.tokenizer.encode_pair(premise, hypothesis)?;
                let logits = self.pair_logits(encoding)?;
                Ok(logits[self.entailment_idx])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_entailment_column() {
        let config = r#"{"id2label": {"0": "ENTAILMENT", "1": "NEUTRAL", "2": "CONTRADICTION"}}"#;
        assert_eq!(entailment_index(config).unwrap(), (0, 3));

        let config = r#"{"id2label": {"0": "contradiction", "1": "neutral", "2": "entailment"}}"#;
        assert_eq!(entailment_index(config).unwrap(), (2, 3));
    }

    #[test]
    fn config_without_entailment_is_rejected() {
        let err = entailment_index(r#"{"id2label": {"0": "POSITIVE", "1": "NEGATIVE"}}"#)
            .unwrap_err();
        assert!(matches!(err, ModelLoadError::Config(_)));
        assert!(matches!(entailment_index("{}"), Err(ModelLoadError::Config(_))));
    }
}
