use std::path::Path;

use image::imageops::FilterType;

use crate::pipeline::pipeline_config::Interpolation;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes frames to disk with the `image` crate; the format follows the
/// file extension.
pub struct ImageFileWriter {
    filter: FilterType,
}

impl ImageFileWriter {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            filter: interpolation.filter_type(),
        }
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new(Interpolation::default())
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: (u32, u32),
    ) -> Result<(), Box<dyn std::error::Error>> {
        let img = frame
            .to_rgb_image()
            .ok_or("Frame data does not match its dimensions")?;

        let (w, h) = size;
        let img = if img.dimensions() == size {
            img
        } else {
            image::imageops::resize(&img, w, h, self.filter)
        };

        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Frame::new(data, width, height, 0)
    }

    #[test]
    fn test_write_resizes_to_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0.png");
        let writer = ImageFileWriter::default();
        writer
            .write(&path, &solid_frame(320, 180, [10, 20, 30]), (224, 224))
            .unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (224, 224));
    }

    #[test]
    fn test_solid_color_survives_resize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0.png");
        let writer = ImageFileWriter::new(Interpolation::Nearest);
        writer
            .write(&path, &solid_frame(64, 48, [50, 100, 200]), (16, 16))
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(7, 7).0, [50, 100, 200]);
    }

    #[test]
    fn test_write_same_size_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0.png");
        let frame = Frame::new(vec![255, 0, 0, 0, 255, 0], 2, 1, 0);
        ImageFileWriter::default()
            .write(&path, &frame, (2, 1))
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 255, 0]);
    }

    #[test]
    fn test_write_jpeg_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_30.jpg");
        ImageFileWriter::default()
            .write(&path, &solid_frame(32, 32, [0, 0, 0]), (224, 224))
            .unwrap();
        assert_eq!(
            image::ImageFormat::from_path(&path).unwrap(),
            image::ImageFormat::Jpeg
        );
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let writer = ImageFileWriter::default();
        let result = writer.write(
            Path::new("/nonexistent/scratch/frame_0.jpg"),
            &solid_frame(4, 4, [0, 0, 0]),
            (4, 4),
        );
        assert!(result.is_err());
    }
}
