use std::path::Path;
use std::sync::{Arc, Mutex};

use ndarray::Array4;

use crate::classification::domain::inference_engine::InferenceEngine;
use crate::classification::infrastructure::execution_provider::preferred_execution_providers;
use crate::shared::error::PipelineError;

/// Image classifier backed by an ONNX Runtime session.
///
/// One loaded model serves every run: clones share the session behind a
/// mutex, so concurrent runs serialize only around the `run` call itself.
#[derive(Clone)]
pub struct OnnxInferenceEngine {
    session: Arc<Mutex<ort::session::Session>>,
    output_len: Option<usize>,
    input_size: Option<(u32, u32)>,
}

impl OnnxInferenceEngine {
    /// Loads the model at `model_path`. A missing or unloadable model is a
    /// configuration error.
    pub fn from_file(model_path: &Path) -> Result<Self, PipelineError> {
        if !model_path.is_file() {
            return Err(PipelineError::Configuration(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }
        Self::load(model_path).map_err(|e| {
            PipelineError::Configuration(format!(
                "failed to load model {}: {e}",
                model_path.display()
            ))
        })
    }

    fn load(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        // NCHW input, [N, classes] (or [N, classes, 1, 1]) output.
        let input_size = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                if shape.len() == 4 && shape[2] > 0 && shape[3] > 0 {
                    return Some((shape[3] as u32, shape[2] as u32));
                }
            }
            None
        });
        let output_len = session.outputs().first().and_then(|output| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = output.dtype() {
                if shape.len() >= 2 && shape[1] > 0 {
                    return Some(shape[1] as usize);
                }
            }
            None
        });

        log::debug!(
            "Loaded {} (input {:?}, {:?} classes)",
            model_path.display(),
            input_size,
            output_len
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            output_len,
            input_size,
        })
    }

    /// Spatial input size `(width, height)` declared by the model, if static.
    pub fn input_size(&self) -> Option<(u32, u32)> {
        self.input_size
    }
}

impl InferenceEngine for OnnxInferenceEngine {
    fn run(&mut self, input: &Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(input.clone())?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("classifier produced no outputs".into());
        }
        let scores = outputs[0].try_extract_array::<f32>()?;
        Ok(scores.iter().copied().collect())
    }

    fn output_len(&self) -> Option<usize> {
        self.output_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_configuration_error() {
        let result = OnnxInferenceEngine::from_file(Path::new("/nonexistent/googlenet-3.onnx"));
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_corrupt_model_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"definitely not protobuf").unwrap();
        let result = OnnxInferenceEngine::from_file(&path);
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }
}
