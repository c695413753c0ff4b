use std::path::Path;
use std::sync::Arc;

use ndarray::Array4;

use crate::classification::domain::detection_result::DetectionResult;
use crate::classification::domain::inference_engine::InferenceEngine;
use crate::classification::domain::label_vocabulary::LabelVocabulary;
use crate::classification::domain::probability::{softmax, top_k};
use crate::shared::error::PipelineError;

/// Turns raw engine scores into the `k` most probable labels.
pub struct ImageClassifier {
    engine: Box<dyn InferenceEngine>,
    vocabulary: Arc<LabelVocabulary>,
    top_k: usize,
}

impl ImageClassifier {
    /// Fails with `Configuration` if the engine reports an output size that
    /// disagrees with the vocabulary, or if `top_k` is zero.
    pub fn new(
        engine: Box<dyn InferenceEngine>,
        vocabulary: Arc<LabelVocabulary>,
        top_k: usize,
    ) -> Result<Self, PipelineError> {
        if top_k == 0 {
            return Err(PipelineError::Configuration("top_k must be at least 1".into()));
        }
        if let Some(len) = engine.output_len() {
            vocabulary.ensure_matches(len)?;
        }
        Ok(Self {
            engine,
            vocabulary,
            top_k,
        })
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    /// Returns `min(top_k, vocabulary size)` `(label, probability)` pairs in
    /// descending probability order.
    pub fn classify(&mut self, tensor: &Array4<f32>) -> Result<Vec<(String, f32)>, PipelineError> {
        let scores = self
            .engine
            .run(tensor)
            .map_err(|e| PipelineError::Inference(e.to_string()))?;

        if scores.len() != self.vocabulary.len() {
            return Err(PipelineError::Inference(format!(
                "engine returned {} scores for a vocabulary of {} labels",
                scores.len(),
                self.vocabulary.len()
            )));
        }
        if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
            return Err(PipelineError::Inference(format!(
                "engine returned non-finite score at class {index}"
            )));
        }

        let probabilities = softmax(&scores);
        top_k(&probabilities, self.top_k)
            .into_iter()
            .map(|(index, p)| {
                let label = self.vocabulary.get(index).ok_or_else(|| {
                    PipelineError::Inference(format!("no label for class {index}"))
                })?;
                Ok((label.to_string(), p))
            })
            .collect()
    }

    /// Classifies one sampled frame and attributes every label to it.
    pub fn classify_frame(
        &mut self,
        tensor: &Array4<f32>,
        frame_path: &Path,
    ) -> Result<Vec<DetectionResult>, PipelineError> {
        let predictions = self.classify(tensor)?;
        for (label, p) in &predictions {
            log::debug!("{}: {label} ({p:.4})", frame_path.display());
        }
        Ok(predictions
            .into_iter()
            .map(|(label, p)| DetectionResult::new(label, p, frame_path.to_path_buf()))
            .collect())
    }
}
