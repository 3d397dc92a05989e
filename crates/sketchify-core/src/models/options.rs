//! Processing options supplied by the caller to tune sketch generation.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::sketch::SketchStyle;

/// Tuning knobs for preprocessing and stylization.
///
/// Defaults produce a balanced pencil sketch; all fields are bounded so a
/// hostile caller cannot drive the pipeline into degenerate kernels or
/// thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_threshold_order))]
pub struct ProcessingOptions {
    #[serde(default)]
    pub style: SketchStyle,

    /// Output intensity multiplier.
    #[validate(range(min = 0.1, max = 2.0))]
    pub intensity: f32,

    /// Contrast multiplier applied after stylization.
    #[validate(range(min = 0.1, max = 2.0))]
    pub contrast: f32,

    /// Gaussian blur kernel size. Even values are rounded up to the next odd.
    #[validate(range(min = 3, max = 15))]
    pub blur_kernel: u32,

    /// Lower Canny hysteresis threshold.
    #[validate(range(min = 10, max = 200))]
    pub edge_threshold_low: u32,

    /// Upper Canny hysteresis threshold.
    #[validate(range(min = 50, max = 300))]
    pub edge_threshold_high: u32,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        ProcessingOptions {
            style: SketchStyle::default(),
            intensity: 1.0,
            contrast: 1.0,
            blur_kernel: 5,
            edge_threshold_low: 50,
            edge_threshold_high: 150,
        }
    }
}

impl ProcessingOptions {
    /// Blur kernel normalized to an odd size (gaussian kernels must be odd).
    pub fn normalized_blur_kernel(&self) -> u32 {
        if self.blur_kernel % 2 == 0 {
            self.blur_kernel + 1
        } else {
            self.blur_kernel
        }
    }
}

/// Hysteresis thresholds must be ordered; the ranges overlap between 50
/// and 200.
fn validate_threshold_order(options: &ProcessingOptions) -> Result<(), ValidationError> {
    if options.edge_threshold_low >= options.edge_threshold_high {
        return Err(ValidationError::new("edge_threshold_order"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let options = ProcessingOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.blur_kernel, 5);
        assert_eq!(options.edge_threshold_low, 50);
        assert_eq!(options.edge_threshold_high, 150);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let options = ProcessingOptions {
            intensity: 5.0,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = ProcessingOptions {
            blur_kernel: 99,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let options = ProcessingOptions {
            edge_threshold_low: 180,
            edge_threshold_high: 60,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_even_kernel_rounded_to_odd() {
        let options = ProcessingOptions {
            blur_kernel: 6,
            ..Default::default()
        };
        assert_eq!(options.normalized_blur_kernel(), 7);

        let options = ProcessingOptions {
            blur_kernel: 5,
            ..Default::default()
        };
        assert_eq!(options.normalized_blur_kernel(), 5);
    }
}
