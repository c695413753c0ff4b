pub mod detection_result;
pub mod image_classifier;
pub mod inference_engine;
pub mod label_vocabulary;
pub mod probability;
