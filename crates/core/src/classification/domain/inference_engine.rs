use ndarray::Array4;

/// Opaque classifier: an NCHW float tensor in, one raw score per class out.
///
/// Implementations hold session state, hence `&mut self`. A single engine
/// instance is never used by two runs at once.
pub trait InferenceEngine: Send {
    fn run(&mut self, input: &Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>>;

    /// Number of scores `run` returns, when known before the first call.
    fn output_len(&self) -> Option<usize> {
        None
    }
}
