//! Thumbnail generation - center-crop to target aspect, then exact resize.

use image::{imageops, GrayImage};
use sketchify_core::SketchError;

use crate::stylize::StylizedImage;

/// Fixed-dimension preview derived from the stylized output.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub gray: GrayImage,
    pub width: u32,
    pub height: u32,
}

pub struct ThumbnailGenerator;

impl ThumbnailGenerator {
    /// Derive a thumbnail of exactly `target_width` x `target_height`.
    ///
    /// Crops the largest centered region matching the target aspect ratio,
    /// then resizes with Lanczos3. Deterministic.
    pub fn thumbnail(
        stylized: &StylizedImage,
        target_width: u32,
        target_height: u32,
    ) -> Result<Thumbnail, SketchError> {
        if target_width == 0 || target_height == 0 {
            return Err(SketchError::Thumbnail(format!(
                "invalid target dimensions {}x{}",
                target_width, target_height
            )));
        }

        let (src_width, src_height) = stylized.gray.dimensions();
        let (crop_width, crop_height) =
            crop_region(src_width, src_height, target_width, target_height);
        let x = (src_width - crop_width) / 2;
        let y = (src_height - crop_height) / 2;

        let cropped = imageops::crop_imm(&stylized.gray, x, y, crop_width, crop_height).to_image();
        let resized = imageops::resize(
            &cropped,
            target_width,
            target_height,
            imageops::FilterType::Lanczos3,
        );

        Ok(Thumbnail {
            gray: resized,
            width: target_width,
            height: target_height,
        })
    }
}

/// Largest centered region of the source matching the target aspect ratio.
fn crop_region(
    src_width: u32,
    src_height: u32,
    target_width: u32,
    target_height: u32,
) -> (u32, u32) {
    // Compare src_w/src_h against target_w/target_h using cross products to
    // stay in integer arithmetic
    let src_wide = (src_width as u64) * (target_height as u64);
    let target_wide = (target_width as u64) * (src_height as u64);

    if src_wide > target_wide {
        // Source is wider than the target aspect: trim width
        let crop_width = ((target_wide / target_height as u64) as u32).max(1);
        (crop_width.min(src_width), src_height)
    } else if src_wide < target_wide {
        // Source is taller: trim height
        let crop_height = ((src_wide / target_width as u64) as u32).max(1);
        (src_width, crop_height.min(src_height))
    } else {
        (src_width, src_height)
    }
}
