pub mod infrastructure;
pub mod pipeline_config;
pub mod pipeline_logger;
pub mod process_video_use_case;
pub mod result_reducer;
pub mod scratch_dir;
pub mod video_classification_service;
