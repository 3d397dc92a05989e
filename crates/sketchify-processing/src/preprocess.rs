//! Preprocessing - deterministic normalization ahead of stylization.
//!
//! Fixed stage order: resize-to-bound, alpha flattening onto white,
//! grayscale conversion, gaussian denoise, contrast stretch. Every stage is
//! pure; repeating a call with the same input and options yields
//! byte-identical output.

use image::{imageops, DynamicImage, GenericImageView, GrayImage, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use sketchify_core::{ProcessingOptions, SketchError};

use crate::validator::ValidatedImage;

/// Normalized raster ready for stylization.
///
/// Carries both the flattened color image (persisted as the "original"
/// artifact) and the grayscale working raster the stylization engine
/// consumes.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub rgb: RgbImage,
    pub gray: GrayImage,
    pub width: u32,
    pub height: u32,
}

pub struct Preprocessor {
    max_bound_edge: u32,
    min_edge: u32,
}

impl Preprocessor {
    pub fn new(max_bound_edge: u32, min_edge: u32) -> Self {
        Self {
            max_bound_edge,
            min_edge,
        }
    }

    /// Run the full preprocessing pipeline.
    pub fn prepare(
        &self,
        validated: &ValidatedImage,
        options: &ProcessingOptions,
    ) -> Result<PreprocessedImage, SketchError> {
        let (width, height) = validated.image.dimensions();
        if width < self.min_edge || height < self.min_edge {
            return Err(SketchError::Preprocessing(format!(
                "image {}x{} is below the minimum edge of {}",
                width, height, self.min_edge
            )));
        }

        let resized = self.resize_to_bound(&validated.image);
        let rgb = flatten_to_rgb(&resized);
        let gray = DynamicImage::ImageRgb8(rgb.clone()).to_luma8();

        let sigma = gaussian_sigma(options.normalized_blur_kernel());
        let denoised = gaussian_blur_f32(&gray, sigma);
        let stretched = stretch_contrast(&denoised);

        let (out_width, out_height) = stretched.dimensions();
        Ok(PreprocessedImage {
            rgb,
            gray: stretched,
            width: out_width,
            height: out_height,
        })
    }

    /// Cap the longest edge at the configured bound, preserving aspect ratio.
    /// Images already within the bound pass through untouched.
    fn resize_to_bound(&self, img: &DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        let longest = width.max(height);
        if longest <= self.max_bound_edge {
            return img.clone();
        }

        let scale = self.max_bound_edge as f32 / longest as f32;
        let new_width = ((width as f32 * scale).round() as u32).max(1);
        let new_height = ((height as f32 * scale).round() as u32).max(1);
        let filter = select_filter(width, height, new_width, new_height);
        img.resize_exact(new_width, new_height, filter)
    }
}

/// Select resampling filter based on resize ratio: cheap filters for heavy
/// downscales, Lanczos3 for near-1:1 work.
pub fn select_filter(
    orig_width: u32,
    orig_height: u32,
    new_width: u32,
    new_height: u32,
) -> imageops::FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        imageops::FilterType::Triangle
    } else if max_ratio > 1.5 {
        imageops::FilterType::CatmullRom
    } else {
        imageops::FilterType::Lanczos3
    }
}

/// Flatten any alpha channel onto a white background and drop to RGB.
fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        let blend = |c: u8| -> u8 { ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8 };
        out.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }

    out
}

/// Gaussian sigma for a given odd kernel size (OpenCV's ksize→sigma rule).
fn gaussian_sigma(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Stretch the used luminance range to the full 8-bit range. A flat image
/// (min == max) passes through unchanged.
fn stretch_contrast(img: &GrayImage) -> GrayImage {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for pixel in img.pixels() {
        min = min.min(pixel.0[0]);
        max = max.max(pixel.0[0]);
    }

    if min >= max {
        return img.clone();
    }

    let range = (max - min) as f32;
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let v = ((pixel.0[0] - min) as f32 * 255.0 / range).round() as u8;
        out.put_pixel(x, y, image::Luma([v]));
    }
    out
}
