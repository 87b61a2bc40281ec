//! Image preprocessing for the monument classifier.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use tracing::debug;

use crate::error::PredictionError;
use tugu_inference::InputTensor;

/// Side length the classifier was trained on.
pub const INPUT_SIZE: u32 = 224;

/// Channels per pixel in the tensor buffer (R, G, B).
pub const CHANNELS: usize = 3;

/// Pack an RGBA pixel into a 32-bit ARGB integer.
pub fn pack_argb(pixel: &Rgba<u8>) -> u32 {
    let [r, g, b, a] = pixel.0;
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Extract normalized R, G, B from a packed ARGB pixel. Alpha is dropped.
pub fn unpack_argb(pixel: u32) -> [f32; 3] {
    let r = ((pixel >> 16) & 0xFF) as f32 / 255.0;
    let g = ((pixel >> 8) & 0xFF) as f32 / 255.0;
    let b = (pixel & 0xFF) as f32 / 255.0;
    [r, g, b]
}

/// A raw grid of ARGB-packed pixels, as handed over by camera or bitmap APIs.
#[derive(Debug, Clone)]
pub struct ArgbImage {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl ArgbImage {
    /// Wrap a row-major pixel grid. The grid must be non-empty and exactly `width * height` long.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, PredictionError> {
        if width == 0 || height == 0 {
            return Err(PredictionError::Inference(format!(
                "invalid image: empty ({}x{})",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(PredictionError::Inference(format!(
                "invalid image: {} pixels for a {}x{} grid",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Convert into an RGBA image.
    pub fn to_dynamic(&self) -> DynamicImage {
        let image = RgbaImage::from_fn(self.width, self.height, |x, y| {
            let argb = self.pixels[(y * self.width + x) as usize];
            Rgba([
                (argb >> 16 & 0xFF) as u8,
                (argb >> 8 & 0xFF) as u8,
                (argb & 0xFF) as u8,
                (argb >> 24 & 0xFF) as u8,
            ])
        });
        DynamicImage::ImageRgba8(image)
    }
}

/// Turns an arbitrary image into the classifier's input buffer.
///
/// Output layout is NHWC with a batch of one: row-major pixels, each
/// contributing R, G, B in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    input_size: u32,
    filter: FilterType,
}

impl ImagePreprocessor {
    /// Create a preprocessor for the 224x224 model input.
    pub fn new() -> Self {
        Self {
            input_size: INPUT_SIZE,
            filter: FilterType::Triangle,
        }
    }

    /// Override the square input side.
    #[cfg(test)]
    pub(crate) fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    /// Element count every buffer produced by this preprocessor has.
    pub fn buffer_len(&self) -> usize {
        self.input_size as usize * self.input_size as usize * CHANNELS
    }

    /// Tensor shape the buffer is reshaped to.
    pub fn input_shape(&self) -> [usize; 4] {
        let side = self.input_size as usize;
        [1, side, side, CHANNELS]
    }

    /// Resize and normalize an image into a flat R,G,B buffer.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<Vec<f32>, PredictionError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PredictionError::Inference(format!(
                "invalid image: empty ({}x{})",
                width, height
            )));
        }
        debug!(
            "Preprocessing {}x{} image to {}x{}",
            width, height, self.input_size, self.input_size
        );

        let resized = image
            .resize_exact(self.input_size, self.input_size, self.filter)
            .to_rgba8();

        let mut buffer = Vec::with_capacity(self.buffer_len());
        for pixel in resized.pixels() {
            buffer.extend_from_slice(&unpack_argb(pack_argb(pixel)));
        }

        debug_assert_eq!(buffer.len(), self.buffer_len());
        Ok(buffer)
    }

    /// Preprocess a raw ARGB pixel grid.
    pub fn preprocess_argb(&self, image: &ArgbImage) -> Result<Vec<f32>, PredictionError> {
        self.preprocess(&image.to_dynamic())
    }

    /// Shape a buffer into the model's input tensor.
    pub fn to_input_tensor(&self, buffer: Vec<f32>) -> Result<InputTensor, PredictionError> {
        InputTensor::from_f32(buffer, &self.input_shape())
            .map_err(|e| PredictionError::Inference(e.to_string()))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn test_buffer_length_is_fixed() {
        let preprocessor = ImagePreprocessor::new();
        for (w, h) in [(1, 1), (224, 224), (640, 480), (300, 1000)] {
            let buffer = preprocessor.preprocess(&solid(w, h, [10, 20, 30, 255])).unwrap();
            assert_eq!(buffer.len(), 224 * 224 * 3, "size {}x{}", w, h);
        }
    }

    #[test]
    fn test_unpack_argb_channels() {
        assert_eq!(unpack_argb(0xFFFF_FFFF), [1.0, 1.0, 1.0]);
        assert_eq!(unpack_argb(0xFF00_0000), [0.0, 0.0, 0.0]);
        assert_eq!(unpack_argb(0x00FF_0000), [1.0, 0.0, 0.0]);
        assert_eq!(unpack_argb(0x1200_FF00), [0.0, 1.0, 0.0]);
        assert_eq!(unpack_argb(0x0000_00FF), [0.0, 0.0, 1.0]);

        let [r, g, b] = unpack_argb(0x8040_2010);
        assert!((r - 64.0 / 255.0).abs() < 1e-6);
        assert!((g - 32.0 / 255.0).abs() < 1e-6);
        assert!((b - 16.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_pack_argb_layout() {
        assert_eq!(pack_argb(&Rgba([0x11, 0x22, 0x33, 0x44])), 0x4411_2233);
    }

    #[test]
    fn test_channel_order() {
        let preprocessor = ImagePreprocessor::new().with_input_size(4);
        let buffer = preprocessor
            .preprocess(&solid(9, 5, [255, 0, 128, 255]))
            .unwrap();

        assert_eq!(buffer.len(), 4 * 4 * 3);
        for rgb in buffer.chunks_exact(3) {
            assert_eq!(rgb[0], 1.0);
            assert_eq!(rgb[1], 0.0);
            assert!((rgb[2] - 128.0 / 255.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_values_are_normalized() {
        let mut image = RgbaImage::new(31, 17);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 8) as u8, (y * 15) as u8, ((x + y) * 5) as u8, 255]);
        }

        let buffer = ImagePreprocessor::new()
            .preprocess(&DynamicImage::ImageRgba8(image))
            .unwrap();
        assert!(buffer.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_empty_image_fails_fast() {
        let err = ImagePreprocessor::new()
            .preprocess(&DynamicImage::new_rgb8(0, 0))
            .unwrap_err();
        assert!(matches!(err, PredictionError::Inference(_)));
    }

    #[test]
    fn test_argb_grid_validation() {
        assert!(ArgbImage::from_pixels(2, 2, vec![0; 3]).is_err());
        assert!(ArgbImage::from_pixels(0, 2, Vec::new()).is_err());

        let grid = ArgbImage::from_pixels(2, 1, vec![0xFF10_2030, 0x00FF_FFFF]).unwrap();
        let rgba = grid.to_dynamic().to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0, [0x10, 0x20, 0x30, 0xFF]);
        assert_eq!(rgba.get_pixel(1, 0).0, [0xFF, 0xFF, 0xFF, 0x00]);
    }

    #[test]
    fn test_input_tensor_shape() {
        let preprocessor = ImagePreprocessor::new();
        let buffer = preprocessor.preprocess(&solid(50, 60, [0, 0, 0, 255])).unwrap();
        let tensor = preprocessor.to_input_tensor(buffer).unwrap();
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);

        assert!(preprocessor.to_input_tensor(vec![0.0; 10]).is_err());
    }
}
