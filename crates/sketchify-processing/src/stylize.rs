//! Stylization - converts a preprocessed photograph into a sketch raster.
//!
//! The engine is a capability behind the [`StylizationEngine`] trait so the
//! pipeline can swap in a learned model later; the shipped implementation is
//! a classical edge-extraction algorithm. Implementations must be
//! deterministic for a fixed model version and must preserve input
//! dimensions.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;
use sketchify_core::{ProcessingOptions, SketchError, SketchStyle};

use crate::preprocess::PreprocessedImage;

/// Stylized raster with provenance.
#[derive(Debug, Clone)]
pub struct StylizedImage {
    pub gray: GrayImage,
    pub width: u32,
    pub height: u32,
    pub model_version: String,
}

/// Sketch generation capability.
///
/// Implementations run on the caller's thread; the pipeline offloads calls
/// to a bounded blocking executor and applies the deadline there.
pub trait StylizationEngine: Send + Sync {
    /// Identifier recorded on every sketch for reproducibility.
    fn model_version(&self) -> &str;

    /// Apply the sketch transform. Output dimensions must equal input
    /// dimensions.
    fn stylize(
        &self,
        input: &PreprocessedImage,
        options: &ProcessingOptions,
    ) -> Result<StylizedImage, SketchError>;
}

const MODEL_VERSION: &str = "classical-sketch-v1";

/// Classical edge-extraction engine: gaussian blur, Canny edges, and
/// per-style composition against the grayscale base.
#[derive(Debug, Default)]
pub struct ClassicalSketchEngine;

impl ClassicalSketchEngine {
    pub fn new() -> Self {
        Self
    }

    fn pencil(gray: &GrayImage, options: &ProcessingOptions) -> GrayImage {
        let sigma = kernel_sigma(options.normalized_blur_kernel());
        let blurred = gaussian_blur_f32(gray, sigma);
        let edges = canny(
            &blurred,
            options.edge_threshold_low as f32,
            options.edge_threshold_high as f32,
        );

        // Dark strokes where edges fire, shaded base everywhere else
        let mut out = GrayImage::new(gray.width(), gray.height());
        for (x, y, pixel) in gray.enumerate_pixels() {
            let edge = edges.get_pixel(x, y).0[0] as u16;
            let base = pixel.0[0] as u16;
            let v = (base * (255 - edge) / 255) as f32 * options.intensity;
            out.put_pixel(x, y, image::Luma([v.clamp(0.0, 255.0) as u8]));
        }
        out
    }

    fn charcoal(gray: &GrayImage, options: &ProcessingOptions) -> GrayImage {
        // Heavier blur and looser thresholds than pencil, then a gamma curve
        // that deepens the dark regions
        let sigma = kernel_sigma(options.normalized_blur_kernel() * 2 + 1);
        let blurred = gaussian_blur_f32(gray, sigma);
        let edges = canny(
            &blurred,
            (options.edge_threshold_low as f32 / 2.0).max(1.0),
            (options.edge_threshold_high as f32 / 2.0).max(2.0),
        );

        let boost = options.contrast * 1.5;
        let mut out = GrayImage::new(gray.width(), gray.height());
        for (x, y, pixel) in gray.enumerate_pixels() {
            let edge = edges.get_pixel(x, y).0[0] as u16;
            let base = pixel.0[0] as u16;
            let v = ((base * (255 - edge) / 255) as f32 * boost).clamp(0.0, 255.0);
            let v = (v / 255.0).powf(1.2) * 255.0;
            out.put_pixel(x, y, image::Luma([v.clamp(0.0, 255.0) as u8]));
        }
        out
    }

    fn ink(gray: &GrayImage, options: &ProcessingOptions) -> GrayImage {
        // Strong edges only; closed strokes on a white background
        let blurred = gaussian_blur_f32(gray, kernel_sigma(3));
        let edges = canny(
            &blurred,
            (options.edge_threshold_low * 2) as f32,
            (options.edge_threshold_high * 2) as f32,
        );
        let strokes = close(&edges, Norm::LInf, 1);

        let mut out = GrayImage::new(gray.width(), gray.height());
        for (x, y, pixel) in strokes.enumerate_pixels() {
            out.put_pixel(x, y, image::Luma([255 - pixel.0[0]]));
        }
        out
    }

    fn post_process(img: GrayImage, options: &ProcessingOptions) -> GrayImage {
        if (options.contrast - 1.0).abs() < f32::EPSILON {
            return img;
        }

        let factor = options.contrast;
        let intercept = 128.0 * (1.0 - factor);
        let mut out = GrayImage::new(img.width(), img.height());
        for (x, y, pixel) in img.enumerate_pixels() {
            let v = (pixel.0[0] as f32 * factor + intercept).clamp(0.0, 255.0) as u8;
            out.put_pixel(x, y, image::Luma([v]));
        }
        out
    }
}

impl StylizationEngine for ClassicalSketchEngine {
    fn model_version(&self) -> &str {
        MODEL_VERSION
    }

    fn stylize(
        &self,
        input: &PreprocessedImage,
        options: &ProcessingOptions,
    ) -> Result<StylizedImage, SketchError> {
        if input.gray.width() == 0 || input.gray.height() == 0 {
            return Err(SketchError::StylizationUnavailable(
                "stylization input has zero area".to_string(),
            ));
        }

        let raw = match options.style {
            SketchStyle::Pencil => Self::pencil(&input.gray, options),
            SketchStyle::Charcoal => Self::charcoal(&input.gray, options),
            SketchStyle::Ink => Self::ink(&input.gray, options),
        };
        let styled = Self::post_process(raw, options);

        let (width, height) = styled.dimensions();
        debug_assert_eq!((width, height), (input.width, input.height));

        Ok(StylizedImage {
            gray: styled,
            width,
            height,
            model_version: MODEL_VERSION.to_string(),
        })
    }
}

/// Gaussian sigma for a given odd kernel size (OpenCV's ksize→sigma rule).
fn kernel_sigma(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}
