pub mod execution_provider;
pub mod onnx_inference_engine;
pub mod tensor_preprocessor;
