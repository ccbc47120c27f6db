use crate::error::MeterError;
use serde::Serialize;

/// Default display band: 20%-60% of the image height
pub const DEFAULT_ROI_TOP: f64 = 0.2;
pub const DEFAULT_ROI_BOTTOM: f64 = 0.6;
/// Default display band: 10%-90% of the image width
pub const DEFAULT_ROI_LEFT: f64 = 0.1;
pub const DEFAULT_ROI_RIGHT: f64 = 0.9;

/// Region of interest expressed as fractions of the image dimensions.
///
/// Each bound is in `[0, 1]`, with `top < bottom` and `left < right`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoiSpec {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for RoiSpec {
    fn default() -> Self {
        Self {
            top: DEFAULT_ROI_TOP,
            bottom: DEFAULT_ROI_BOTTOM,
            left: DEFAULT_ROI_LEFT,
            right: DEFAULT_ROI_RIGHT,
        }
    }
}

/// Absolute crop rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RoiSpec {
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Result<Self, MeterError> {
        let roi = Self {
            top,
            bottom,
            left,
            right,
        };
        roi.validate()?;
        Ok(roi)
    }

    /// Check the fractional invariants without looking at any image
    pub fn validate(&self) -> Result<(), MeterError> {
        for (name, value) in [
            ("top", self.top),
            ("bottom", self.bottom),
            ("left", self.left),
            ("right", self.right),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MeterError::PreprocessError(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.top >= self.bottom {
            return Err(MeterError::PreprocessError(format!(
                "top ({}) must be less than bottom ({})",
                self.top, self.bottom
            )));
        }
        if self.left >= self.right {
            return Err(MeterError::PreprocessError(format!(
                "left ({}) must be less than right ({})",
                self.left, self.right
            )));
        }

        Ok(())
    }

    /// Resolve the fractions against concrete image dimensions.
    ///
    /// Edges are truncated toward zero, so a tiny image can collapse the
    /// region to zero area, which is rejected.
    pub fn crop_rect(&self, width: u32, height: u32) -> Result<CropRect, MeterError> {
        self.validate()?;

        let y0 = scale(height, self.top);
        let y1 = scale(height, self.bottom);
        let x0 = scale(width, self.left);
        let x1 = scale(width, self.right);

        if y1 <= y0 || x1 <= x0 {
            return Err(MeterError::PreprocessError(format!(
                "region resolves to zero area on a {}x{} image",
                width, height
            )));
        }

        Ok(CropRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

fn scale(dimension: u32, fraction: f64) -> u32 {
    ((dimension as f64 * fraction) as u32).min(dimension)
}
