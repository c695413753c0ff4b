use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;

use crate::shared::constants::BGR_MEAN;
use crate::shared::error::PipelineError;

/// Loads a sampled frame and lays it out as the classifier expects:
/// `[1, 3, H, W]`, channels in B, G, R order with the per-channel mean
/// subtracted and no scaling.
pub struct TensorPreprocessor {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl TensorPreprocessor {
    pub fn new(size: (u32, u32), filter: FilterType) -> Self {
        Self {
            width: size.0,
            height: size.1,
            filter,
        }
    }

    pub fn preprocess(&self, image_path: &Path) -> Result<Array4<f32>, PipelineError> {
        let img = image::open(image_path)
            .map_err(|e| PipelineError::ImageDecode {
                path: image_path.to_path_buf(),
                reason: e.to_string(),
            })?
            .to_rgb8();
        Ok(self.to_tensor(&img))
    }

    pub fn to_tensor(&self, img: &RgbImage) -> Array4<f32> {
        let resized;
        let img = if img.dimensions() == (self.width, self.height) {
            img
        } else {
            resized = image::imageops::resize(img, self.width, self.height, self.filter);
            &resized
        };

        let (w, h) = (self.width as usize, self.height as usize);
        let mut tensor = Array4::<f32>::zeros((1, 3, h, w));
        for (x, y, pixel) in img.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = b as f32 - BGR_MEAN[0];
            tensor[[0, 1, y, x]] = g as f32 - BGR_MEAN[1];
            tensor[[0, 2, y, x]] = r as f32 - BGR_MEAN[2];
        }
        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;

    fn preprocessor(size: u32) -> TensorPreprocessor {
        TensorPreprocessor::new((size, size), FilterType::Triangle)
    }

    #[test]
    fn test_channels_are_bgr_minus_mean() {
        let img = RgbImage::from_pixel(2, 2, Rgb([200, 100, 50]));
        let tensor = preprocessor(2).to_tensor(&img);

        assert_eq!(tensor.shape(), &[1, 3, 2, 2]);
        assert_relative_eq!(tensor[[0, 0, 1, 1]], 50.0 - 103.939, epsilon = 1e-4);
        assert_relative_eq!(tensor[[0, 1, 1, 1]], 100.0 - 116.779, epsilon = 1e-4);
        assert_relative_eq!(tensor[[0, 2, 1, 1]], 200.0 - 123.68, epsilon = 1e-4);
    }

    #[test]
    fn test_pixel_position_preserved() {
        let mut img = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        img.put_pixel(2, 1, Rgb([255, 255, 255]));
        let tensor = TensorPreprocessor::new((3, 2), FilterType::Nearest).to_tensor(&img);

        assert_eq!(tensor.shape(), &[1, 3, 2, 3]);
        assert_relative_eq!(tensor[[0, 0, 1, 2]], 255.0 - 103.939, epsilon = 1e-4);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], -103.939, epsilon = 1e-4);
    }

    #[test]
    fn test_resizes_when_dimensions_differ() {
        let img = RgbImage::from_pixel(100, 60, Rgb([123, 117, 104]));
        let tensor = preprocessor(224).to_tensor(&img);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        // Solid color survives any interpolation; values sit near zero.
        assert!(tensor.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn test_preprocess_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0.png");
        RgbImage::from_pixel(224, 224, Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let tensor = preprocessor(224).preprocess(&path).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 30.0 - 103.939, epsilon = 1e-4);
    }

    #[test]
    fn test_missing_file_is_image_decode_error() {
        let result = preprocessor(224).preprocess(Path::new("/nonexistent/frame_0.jpg"));
        assert!(matches!(result, Err(PipelineError::ImageDecode { .. })));
    }

    #[test]
    fn test_garbage_file_is_image_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();
        let result = preprocessor(224).preprocess(&path);
        assert!(matches!(result, Err(PipelineError::ImageDecode { .. })));
    }
}
