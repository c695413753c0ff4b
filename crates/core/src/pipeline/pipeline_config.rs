use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::shared::constants::{DEFAULT_INPUT_SIZE, DEFAULT_STRIDE, DEFAULT_TOP_K};
use crate::shared::error::PipelineError;

/// What to do when a sampled frame cannot be preprocessed or classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameErrorPolicy {
    /// Fail the whole run on the first bad frame.
    #[default]
    Abort,
    /// Log the failure and continue with the remaining frames.
    Skip,
}

impl std::str::FromStr for FrameErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(FrameErrorPolicy::Abort),
            "skip" => Ok(FrameErrorPolicy::Skip),
            other => Err(format!("expected 'abort' or 'skip', got '{other}'")),
        }
    }
}

/// Resampling filter used when resizing frames to the classifier input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl Interpolation {
    pub fn filter_type(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Triangle => FilterType::Triangle,
            Interpolation::CatmullRom => FilterType::CatmullRom,
            Interpolation::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Tunables for one video classification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sample every `stride`-th frame.
    pub stride: usize,
    pub input_width: u32,
    pub input_height: u32,
    /// Labels kept per frame.
    pub top_k: usize,
    /// Extension (and therefore encoding) of extracted frame images.
    pub frame_format: String,
    pub interpolation: Interpolation,
    pub on_frame_error: FrameErrorPolicy,
    /// Parent of per-run scratch directories. System temp dir when unset.
    pub scratch_root: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            input_width: DEFAULT_INPUT_SIZE,
            input_height: DEFAULT_INPUT_SIZE,
            top_k: DEFAULT_TOP_K,
            frame_format: "jpg".to_string(),
            interpolation: Interpolation::default(),
            on_frame_error: FrameErrorPolicy::default(),
            scratch_root: None,
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            PipelineError::Configuration(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.stride == 0 {
            return Err(PipelineError::Configuration(
                "stride must be a positive frame count".into(),
            ));
        }
        if self.top_k == 0 {
            return Err(PipelineError::Configuration("top_k must be at least 1".into()));
        }
        if self.input_width == 0 || self.input_height == 0 {
            return Err(PipelineError::Configuration(format!(
                "input size must be non-zero, got {}x{}",
                self.input_width, self.input_height
            )));
        }
        if image::ImageFormat::from_extension(&self.frame_format).is_none() {
            return Err(PipelineError::Configuration(format!(
                "unsupported frame format '{}'",
                self.frame_format
            )));
        }
        Ok(())
    }

    pub fn input_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_match_model_contract() {
        let config = PipelineConfig::default();
        assert_eq!(config.stride, 30);
        assert_eq!(config.input_size(), (224, 224));
        assert_eq!(config.top_k, 5);
        assert_eq!(config.on_frame_error, FrameErrorPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::zero_stride(PipelineConfig { stride: 0, ..PipelineConfig::default() })]
    #[case::zero_top_k(PipelineConfig { top_k: 0, ..PipelineConfig::default() })]
    #[case::zero_width(PipelineConfig { input_width: 0, ..PipelineConfig::default() })]
    #[case::unknown_format(PipelineConfig { frame_format: "xyz".into(), ..PipelineConfig::default() })]
    fn test_invalid_configs_rejected(#[case] config: PipelineConfig) {
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, r#"{ "stride": 15, "on_frame_error": "skip" }"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.stride, 15);
        assert_eq!(config.on_frame_error, FrameErrorPolicy::Skip);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.frame_format, "jpg");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, r#"{ "stride": 0 }"#).unwrap();
        assert!(PipelineConfig::load(&path).is_err());
    }

    #[test]
    fn test_load_missing_file_is_configuration_error() {
        let result = PipelineConfig::load(Path::new("/nonexistent/pipeline.json"));
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[rstest]
    #[case::abort("abort", FrameErrorPolicy::Abort)]
    #[case::skip("skip", FrameErrorPolicy::Skip)]
    fn test_policy_from_str(#[case] input: &str, #[case] expected: FrameErrorPolicy) {
        assert_eq!(input.parse::<FrameErrorPolicy>().unwrap(), expected);
    }

    #[test]
    fn test_policy_from_str_rejects_unknown() {
        assert!("retry".parse::<FrameErrorPolicy>().is_err());
    }

    #[test]
    fn test_scratch_root_defaults_to_temp_dir() {
        assert_eq!(PipelineConfig::default().scratch_root(), std::env::temp_dir());
        let custom = PipelineConfig {
            scratch_root: Some(PathBuf::from("/srv/scratch")),
            ..PipelineConfig::default()
        };
        assert_eq!(custom.scratch_root(), PathBuf::from("/srv/scratch"));
    }
}
