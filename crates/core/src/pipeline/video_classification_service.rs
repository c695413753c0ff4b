use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::classification::domain::detection_result::DetectionResult;
use crate::classification::domain::image_classifier::ImageClassifier;
use crate::classification::domain::inference_engine::InferenceEngine;
use crate::classification::domain::label_vocabulary::LabelVocabulary;
use crate::classification::infrastructure::onnx_inference_engine::OnnxInferenceEngine;
use crate::classification::infrastructure::tensor_preprocessor::TensorPreprocessor;
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::process_video_use_case::ProcessVideoUseCase;
use crate::sampling::frame_sampler::FrameSampler;
use crate::shared::error::PipelineError;
use crate::video::domain::frame_source::FrameSource;
use crate::video::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use crate::video::infrastructure::image_file_writer::ImageFileWriter;

/// Builds a fresh inference handle for one run.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn InferenceEngine> + Send + Sync>;

/// Builds a fresh decoder for one run.
pub type SourceFactory = Arc<dyn Fn() -> Box<dyn FrameSource> + Send + Sync>;

/// Process-wide entry point. Holds the read-only state shared by all runs
/// (configuration, vocabulary, loaded model) and wires up a dedicated
/// pipeline for every `process_video` call.
///
/// Safe to share across threads; runs never share decoders or scratch
/// directories.
pub struct VideoClassificationService {
    config: PipelineConfig,
    vocabulary: Arc<LabelVocabulary>,
    engines: EngineFactory,
    sources: SourceFactory,
}

impl VideoClassificationService {
    pub fn new(
        config: PipelineConfig,
        vocabulary: Arc<LabelVocabulary>,
        engines: EngineFactory,
        sources: SourceFactory,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        if let Some(len) = engines().output_len() {
            vocabulary.ensure_matches(len)?;
        }
        Ok(Self {
            config,
            vocabulary,
            engines,
            sources,
        })
    }

    /// Loads the ONNX model and label file once and decodes with ffmpeg.
    ///
    /// Missing files, an empty vocabulary, a vocabulary that does not match
    /// the model output, or a model whose input size disagrees with the
    /// configuration are all `Configuration` errors.
    pub fn from_assets(
        config: PipelineConfig,
        model_path: &Path,
        labels_path: &Path,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let vocabulary = Arc::new(LabelVocabulary::load(labels_path)?);
        let engine = OnnxInferenceEngine::from_file(model_path)?;

        if let Some(model_size) = engine.input_size() {
            if model_size != config.input_size() {
                return Err(PipelineError::Configuration(format!(
                    "model expects {}x{} input, configured for {}x{}",
                    model_size.0, model_size.1, config.input_width, config.input_height
                )));
            }
        }

        log::info!(
            "Loaded classifier {} with {} labels",
            model_path.display(),
            vocabulary.len()
        );

        Self::new(
            config,
            vocabulary,
            Arc::new(move || -> Box<dyn InferenceEngine> { Box::new(engine.clone()) }),
            Arc::new(|| -> Box<dyn FrameSource> { Box::new(FfmpegFrameSource::new()) }),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    /// Classifies one video. See [`ProcessVideoUseCase::execute`].
    pub fn process_video(&self, path: &Path) -> Result<Vec<DetectionResult>, PipelineError> {
        self.process_video_with(path, Box::new(NullPipelineLogger), None)
    }

    /// Like `process_video`, reporting to `logger` and observing `cancelled`
    /// between frames.
    pub fn process_video_with(
        &self,
        path: &Path,
        logger: Box<dyn PipelineLogger>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Result<Vec<DetectionResult>, PipelineError> {
        let mut use_case = self.use_case(logger, cancelled)?;
        use_case.execute(path)
    }

    fn use_case(
        &self,
        logger: Box<dyn PipelineLogger>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Result<ProcessVideoUseCase, PipelineError> {
        let config = &self.config;
        let sampler = FrameSampler::new(
            Box::new(ImageFileWriter::new(config.interpolation)),
            config.stride,
            config.input_size(),
            config.frame_format.clone(),
        )?;
        let preprocessor =
            TensorPreprocessor::new(config.input_size(), config.interpolation.filter_type());
        let classifier =
            ImageClassifier::new((self.engines)(), self.vocabulary.clone(), config.top_k)?;

        Ok(ProcessVideoUseCase::new(
            (self.sources)(),
            sampler,
            preprocessor,
            classifier,
            config.on_frame_error,
            config.scratch_root(),
            logger,
            None,
            cancelled,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::infrastructure::ffmpeg_frame_source::tests::write_gray_ramp_video;
    use ndarray::Array4;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FixedEngine {
        scores: Vec<f32>,
    }

    impl InferenceEngine for FixedEngine {
        fn run(&mut self, _input: &Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            Ok(self.scores.clone())
        }

        fn output_len(&self) -> Option<usize> {
            Some(self.scores.len())
        }
    }

    struct GrayFrames {
        total_frames: usize,
        opened: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl FrameSource for GrayFrames {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            self.opened.lock().unwrap().push(path.to_path_buf());
            Ok(VideoMetadata {
                width: 16,
                height: 16,
                fps: 30.0,
                total_frames: self.total_frames,
                codec: "stub".into(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn read_frame(
            &mut self,
            index: usize,
        ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            Ok(Some(Frame::new(vec![100; 16 * 16 * 3], 16, 16, index)))
        }

        fn close(&mut self) {}
    }

    fn vocabulary(n: usize) -> Arc<LabelVocabulary> {
        Arc::new(LabelVocabulary::new((0..n).map(|i| format!("label_{i}")).collect()).unwrap())
    }

    fn config(scratch_root: &Path) -> PipelineConfig {
        PipelineConfig {
            input_width: 16,
            input_height: 16,
            scratch_root: Some(scratch_root.to_path_buf()),
            ..PipelineConfig::default()
        }
    }

    fn service(
        scratch_root: &Path,
        total_frames: usize,
        opened: Arc<Mutex<Vec<PathBuf>>>,
    ) -> VideoClassificationService {
        VideoClassificationService::new(
            config(scratch_root),
            vocabulary(8),
            Arc::new(|| -> Box<dyn InferenceEngine> {
                Box::new(FixedEngine {
                    scores: (0..8).map(|i| i as f32).collect(),
                })
            }),
            Arc::new(move || -> Box<dyn FrameSource> {
                Box::new(GrayFrames {
                    total_frames,
                    opened: opened.clone(),
                })
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_process_video_returns_reduced_results() {
        let root = tempfile::tempdir().unwrap();
        let svc = service(root.path(), 95, Arc::new(Mutex::new(Vec::new())));

        let results = svc.process_video(Path::new("clip.mp4")).unwrap();

        assert_eq!(results.len(), 5);
        assert_eq!(results[0].label, "label_7");
        assert!(results.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_each_run_gets_its_own_source() {
        let root = tempfile::tempdir().unwrap();
        let opened = Arc::new(Mutex::new(Vec::new()));
        let svc = service(root.path(), 31, opened.clone());

        svc.process_video(Path::new("a.mp4")).unwrap();
        svc.process_video(Path::new("b.mp4")).unwrap();

        assert_eq!(
            *opened.lock().unwrap(),
            vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")]
        );
    }

    #[test]
    fn test_concurrent_runs_do_not_interfere() {
        let root = tempfile::tempdir().unwrap();
        let svc = Arc::new(service(root.path(), 120, Arc::new(Mutex::new(Vec::new()))));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let svc = svc.clone();
                std::thread::spawn(move || svc.process_video(Path::new(&format!("clip_{i}.mp4"))))
            })
            .collect();

        for handle in handles {
            let results = handle.join().unwrap().unwrap();
            assert_eq!(results.len(), 5);
        }
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_vocabulary_mismatch_rejected_at_startup() {
        let root = tempfile::tempdir().unwrap();
        let result = VideoClassificationService::new(
            config(root.path()),
            vocabulary(1000),
            Arc::new(|| -> Box<dyn InferenceEngine> {
                Box::new(FixedEngine {
                    scores: vec![0.0; 999],
                })
            }),
            Arc::new(|| -> Box<dyn FrameSource> {
                Box::new(GrayFrames {
                    total_frames: 0,
                    opened: Arc::new(Mutex::new(Vec::new())),
                })
            }),
        );
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_invalid_config_rejected_at_startup() {
        let root = tempfile::tempdir().unwrap();
        let bad = PipelineConfig {
            stride: 0,
            ..config(root.path())
        };
        let result = VideoClassificationService::new(
            bad,
            vocabulary(2),
            Arc::new(|| -> Box<dyn InferenceEngine> {
                Box::new(FixedEngine {
                    scores: vec![0.0; 2],
                })
            }),
            Arc::new(|| -> Box<dyn FrameSource> {
                Box::new(GrayFrames {
                    total_frames: 0,
                    opened: Arc::new(Mutex::new(Vec::new())),
                })
            }),
        );
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_from_assets_missing_labels_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = VideoClassificationService::from_assets(
            PipelineConfig::default(),
            &dir.path().join("googlenet-3.onnx"),
            &dir.path().join("imagenet-simple-labels.json"),
        );
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_from_assets_missing_model_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("labels.txt");
        fs::write(&labels, "cat\ndog\n").unwrap();
        let result = VideoClassificationService::from_assets(
            PipelineConfig::default(),
            &dir.path().join("googlenet-3.onnx"),
            &labels,
        );
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_real_decoder_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("ramp.mp4");
        write_gray_ramp_video(&video, 12, 30);
        let scratch_root = dir.path().join("scratch");

        let svc = VideoClassificationService::new(
            PipelineConfig {
                stride: 5,
                ..config(&scratch_root)
            },
            vocabulary(8),
            Arc::new(|| -> Box<dyn InferenceEngine> {
                Box::new(FixedEngine {
                    scores: (0..8).map(|i| -(i as f32)).collect(),
                })
            }),
            Arc::new(|| -> Box<dyn FrameSource> { Box::new(FfmpegFrameSource::new()) }),
        )
        .unwrap();

        let results = svc.process_video(&video).unwrap();

        assert_eq!(results.len(), 5);
        assert_eq!(results[0].label, "label_0");
        assert!(results[0]
            .source_frame_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("frame_0."));
        assert_eq!(fs::read_dir(&scratch_root).unwrap().count(), 0);
    }

    #[test]
    fn test_real_decoder_rejects_non_video() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("notes.mp4");
        fs::write(&bogus, b"this is not a video").unwrap();
        let scratch_root = dir.path().join("scratch");

        let svc = VideoClassificationService::new(
            config(&scratch_root),
            vocabulary(2),
            Arc::new(|| -> Box<dyn InferenceEngine> {
                Box::new(FixedEngine {
                    scores: vec![0.0; 2],
                })
            }),
            Arc::new(|| -> Box<dyn FrameSource> { Box::new(FfmpegFrameSource::new()) }),
        )
        .unwrap();

        let result = svc.process_video(&bogus);
        assert!(matches!(result, Err(PipelineError::SourceUnavailable { .. })));
        assert_eq!(fs::read_dir(&scratch_root).unwrap().count(), 0);
    }
}
