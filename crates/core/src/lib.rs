pub mod classification;
pub mod pipeline;
pub mod sampling;
pub mod shared;
pub mod upload;
pub mod video;
