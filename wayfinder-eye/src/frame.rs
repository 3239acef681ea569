//! Video frames and model input tensors

use crate::error::VisionError;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Upper bound on tensor elements handed to an engine
const MAX_TENSOR_ELEMENTS: usize = 100_000_000;

/// A single RGB video frame
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

/// Normalized `[1, 3, H, W]` tensor with values in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from packed RGB bytes
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::Processing("Frame dimensions cannot be zero".to_string()));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|p| p.checked_mul(3))
            .ok_or_else(|| VisionError::Processing("Frame dimensions would overflow".to_string()))?;
        if pixels.len() != expected {
            return Err(VisionError::Processing(format!(
                "Expected {} bytes for a {}x{} RGB frame, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        RgbImage::from_raw(width, height, pixels)
            .map(Self::new)
            .ok_or_else(|| VisionError::Processing("Invalid RGB buffer".to_string()))
    }

    /// Solid-color frame, mostly useful for tests and warm-up
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Sample one pixel; coordinates are clamped into the frame.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let x = x.min(self.width().saturating_sub(1));
        let y = y.min(self.height().saturating_sub(1));
        self.image.get_pixel(x, y).0
    }

    /// Resize to the model input size and lay the pixels out channels-first.
    pub fn to_chw_tensor(&self, width: u32, height: u32) -> Result<InputTensor, VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::Processing("Target dimensions cannot be zero".to_string()));
        }

        let plane = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| VisionError::Processing("Target dimensions too large, would overflow".to_string()))?;
        let total = plane
            .checked_mul(3)
            .ok_or_else(|| VisionError::Processing("Target dimensions too large, would overflow".to_string()))?;
        if total > MAX_TENSOR_ELEMENTS {
            return Err(VisionError::Processing("Input tensor too large (max 100M elements)".to_string()));
        }

        let resized;
        let source = if self.dimensions() == (width, height) {
            &self.image
        } else {
            resized = imageops::resize(&self.image, width, height, FilterType::Triangle);
            &resized
        };

        let mut data = vec![0.0f32; total];
        for (i, pixel) in source.pixels().enumerate() {
            let [r, g, b] = pixel.0;
            data[i] = r as f32 / 255.0;
            data[plane + i] = g as f32 / 255.0;
            data[2 * plane + i] = b as f32 / 255.0;
        }

        Ok(InputTensor {
            shape: [1, 3, height as usize, width as usize],
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        assert!(Frame::from_raw(2, 2, vec![0; 11]).is_err());
        assert!(Frame::from_raw(0, 2, vec![]).is_err());
        assert!(Frame::from_raw(2, 2, vec![0; 12]).is_ok());
    }

    #[test]
    fn test_pixel_is_clamped() {
        let frame = Frame::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(frame.pixel(0, 0), [1, 2, 3]);
        assert_eq!(frame.pixel(1, 0), [4, 5, 6]);
        assert_eq!(frame.pixel(50, 50), [4, 5, 6]);
    }

    #[test]
    fn test_chw_layout_and_normalization() {
        let frame = Frame::from_raw(2, 1, vec![255, 0, 0, 0, 255, 51]).unwrap();
        let tensor = frame.to_chw_tensor(2, 1).unwrap();
        assert_eq!(tensor.shape, [1, 3, 1, 2]);
        // R plane, G plane, B plane
        assert_eq!(tensor.data, vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.2]);
    }

    #[test]
    fn test_chw_resizes_to_model_input() {
        let frame = Frame::filled(64, 48, [128, 128, 128]);
        let tensor = frame.to_chw_tensor(32, 32).unwrap();
        assert_eq!(tensor.shape, [1, 3, 32, 32]);
        assert_eq!(tensor.data.len(), 3 * 32 * 32);
        for v in &tensor.data {
            assert!((*v - 128.0 / 255.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_chw_rejects_zero_target() {
        let frame = Frame::filled(4, 4, [0, 0, 0]);
        assert!(frame.to_chw_tensor(0, 4).is_err());
    }
}
