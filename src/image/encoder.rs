//! Quality-driven encoders.

use super::ImageError;
use image::RgbaImage;
use ravif::{Img, RGBA8};

/// Encodes decoded pixels at a given quality (1..=100).
pub trait QualityEncoder: Sync {
    /// Extension of the files this encoder produces, without the dot.
    fn extension(&self) -> &'static str;

    fn encode(&self, pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError>;
}

/// Lossy AVIF through `ravif`.
#[derive(Debug, Clone, Copy)]
pub struct AvifEncoder {
    speed: u8,
}

impl AvifEncoder {
    /// `speed` runs from 1 (smallest files) to 10 (fastest).
    pub fn new(speed: u8) -> Self {
        Self {
            speed: speed.clamp(1, 10),
        }
    }
}

impl Default for AvifEncoder {
    fn default() -> Self {
        Self::new(6)
    }
}

impl QualityEncoder for AvifEncoder {
    fn extension(&self) -> &'static str {
        "avif"
    }

    fn encode(&self, pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError> {
        let (width, height) = pixels.dimensions();
        let buffer: Vec<RGBA8> = pixels
            .pixels()
            .map(|p| RGBA8::new(p[0], p[1], p[2], p[3]))
            .collect();

        let encoded = ravif::Encoder::new()
            .with_quality(f32::from(quality))
            .with_speed(self.speed)
            .encode_rgba(Img::new(buffer.as_slice(), width as usize, height as usize))
            .map_err(|err| ImageError::Encode {
                quality,
                message: err.to_string(),
            })?;
        Ok(encoded.avif_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_avif_output_has_ftyp_box() {
        let pixels = RgbaImage::from_pixel(8, 8, Rgba([200, 40, 40, 255]));
        let bytes = AvifEncoder::new(10).encode(&pixels, 60).unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");
    }

    #[test]
    fn test_speed_clamped() {
        assert_eq!(AvifEncoder::new(0).speed, 1);
        assert_eq!(AvifEncoder::new(42).speed, 10);
    }
}
