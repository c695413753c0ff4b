use image::RgbImage;

/// A decoded video frame: tightly packed RGB24 bytes in row-major order.
///
/// `index` is the frame's position in the source's frame index space, not
/// its position among sampled frames.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * 3,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// A frame with no pixels. Decoders may hand these back for corrupt
    /// packets; the sampler treats them as failed decodes.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Copies the pixels into an `image` buffer, or `None` if the buffer
    /// length does not match the dimensions.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![7u8; 2 * 3 * 3];
        let frame = Frame::new(data.clone(), 2, 3, 60);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.index(), 60);
        assert_eq!(frame.data(), &data[..]);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_zero_sized_frame_is_empty() {
        let frame = Frame::new(Vec::new(), 0, 0, 0);
        assert!(frame.is_empty());
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 5], 2, 2, 0);
    }

    #[test]
    fn test_to_rgb_image_preserves_pixel_order() {
        // 2x1: red then blue
        let frame = Frame::new(vec![255, 0, 0, 0, 0, 255], 2, 1, 0);
        let img = frame.to_rgb_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255]);
    }
}
