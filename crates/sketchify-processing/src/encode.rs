//! JPEG encoding for artifact persistence.
//!
//! All artifacts are re-encoded rather than stored byte-for-byte; this
//! normalizes away source metadata (EXIF and friends) as a side effect.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, RgbImage};
use sketchify_core::SketchError;
use std::io::Cursor;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Encode a color raster as JPEG.
pub fn encode_jpeg_rgb(img: &RgbImage, quality: u8) -> Result<Bytes, SketchError> {
    let mut buffer = Vec::with_capacity((img.width() * img.height()) as usize / 4);
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality);
    img.write_with_encoder(encoder)
        .map_err(|e| SketchError::Preprocessing(format!("JPEG encoding failed: {}", e)))?;
    Ok(Bytes::from(buffer))
}

/// Encode a grayscale raster as JPEG.
pub fn encode_jpeg_gray(img: &GrayImage, quality: u8) -> Result<Bytes, SketchError> {
    let mut buffer = Vec::with_capacity((img.width() * img.height()) as usize / 4);
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality);
    img.write_with_encoder(encoder)
        .map_err(|e| SketchError::Preprocessing(format!("JPEG encoding failed: {}", e)))?;
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_encode_rgb_round_trips() {
        let img = RgbImage::from_pixel(64, 48, Rgb([10, 200, 30]));
        let bytes = encode_jpeg_rgb(&img, 90).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn test_encode_gray_round_trips() {
        let img = GrayImage::from_pixel(64, 48, Luma([128]));
        let bytes = encode_jpeg_gray(&img, 90).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let img = GrayImage::from_pixel(32, 32, Luma([77]));
        let first = encode_jpeg_gray(&img, 85).unwrap();
        let second = encode_jpeg_gray(&img, 85).unwrap();
        assert_eq!(first, second);
    }
}
