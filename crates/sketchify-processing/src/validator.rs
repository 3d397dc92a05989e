//! Upload validation - format sniffing, size limits, and decode checks.

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use sketchify_core::SketchError;
use std::io::Cursor;

/// Formats the pipeline accepts. The declared MIME type is cross-checked but
/// never trusted on its own; acceptance is decided by content sniffing.
const SUPPORTED_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Decoded upload, owned exclusively by one pipeline invocation.
#[derive(Debug)]
pub struct ValidatedImage {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
    pub color: image::ColorType,
    pub format: ImageFormat,
    pub source_bytes: u64,
}

/// Upload validator
pub struct ImageValidator {
    max_payload_bytes: usize,
    min_edge: u32,
    max_edge: u32,
}

impl ImageValidator {
    pub fn new(max_payload_bytes: usize, min_edge: u32, max_edge: u32) -> Self {
        Self {
            max_payload_bytes,
            min_edge,
            max_edge,
        }
    }

    /// Validate an upload and decode it.
    ///
    /// Checks run cheapest-first so malformed or oversized payloads are
    /// rejected before any decode cost is incurred. `declared_size` is only
    /// used for a mismatch log; the size limit is enforced against the
    /// actual byte length.
    pub fn validate(
        &self,
        data: &[u8],
        declared_mime: &str,
        declared_size: usize,
    ) -> Result<ValidatedImage, SketchError> {
        if data.is_empty() {
            return Err(SketchError::CorruptImage("empty payload".to_string()));
        }

        if data.len() > self.max_payload_bytes {
            return Err(SketchError::PayloadTooLarge {
                size: data.len(),
                max: self.max_payload_bytes,
            });
        }

        if declared_size != data.len() {
            tracing::debug!(
                declared_size,
                actual_size = data.len(),
                "Declared upload size does not match payload"
            );
        }

        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| SketchError::CorruptImage(format!("unreadable payload: {}", e)))?;

        let format = match reader.format() {
            Some(f) if SUPPORTED_FORMATS.contains(&f) => f,
            Some(f) => {
                return Err(SketchError::UnsupportedFormat(format!(
                    "{:?} is not supported; use JPEG, PNG, or WEBP",
                    f
                )))
            }
            None => {
                return Err(SketchError::UnsupportedFormat(format!(
                    "unrecognized image data (declared type: {})",
                    declared_mime
                )))
            }
        };

        if let Some(declared) = ImageFormat::from_mime_type(declared_mime) {
            if declared != format {
                tracing::debug!(
                    declared_mime,
                    detected = ?format,
                    "Declared MIME type does not match sniffed format"
                );
            }
        }

        let img = reader
            .decode()
            .map_err(|e| SketchError::CorruptImage(e.to_string()))?;

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(SketchError::CorruptImage(
                "decoded image has zero area".to_string(),
            ));
        }

        if width < self.min_edge
            || height < self.min_edge
            || width > self.max_edge
            || height > self.max_edge
        {
            return Err(SketchError::InvalidDimensions {
                width,
                height,
                min: self.min_edge,
                max: self.max_edge,
            });
        }

        let color = img.color();
        Ok(ValidatedImage {
            image: img,
            width,
            height,
            color,
            format,
            source_bytes: data.len() as u64,
        })
    }
}
