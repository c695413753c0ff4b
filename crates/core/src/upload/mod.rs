pub mod response;
pub mod staged_upload;
pub mod upload_handler;
