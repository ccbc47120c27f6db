use crate::error::MeterError;
use image::{DynamicImage, GrayImage, ImageFormat};
use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::time::Instant;

use super::roi::RoiSpec;
use super::steps;

/// Default smoothing kernel (3x3)
pub const DEFAULT_KERNEL_SIZE: u32 = 3;

/// Noise filter applied after the grayscale conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterStrategy {
    /// Crop and grayscale only
    None,
    /// Light Gaussian blur
    #[default]
    Gaussian,
    /// Mean filter
    Box,
    /// Median filter, for salt-and-pepper noise
    Median,
    /// Sauvola binarization; destroys thin strokes on some meter fonts
    AdaptiveThreshold,
}

impl FilterStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gaussian => "gaussian",
            Self::Box => "box",
            Self::Median => "median",
            Self::AdaptiveThreshold => "adaptive-threshold",
        }
    }
}

impl FromStr for FilterStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "gaussian" => Ok(Self::Gaussian),
            "box" => Ok(Self::Box),
            "median" => Ok(Self::Median),
            "adaptive-threshold" | "threshold" => Ok(Self::AdaptiveThreshold),
            other => Err(format!("unknown filter strategy '{}'", other)),
        }
    }
}

impl fmt::Display for FilterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Cropped, single-channel image ready for OCR submission
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    image: GrayImage,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    /// PNG bytes, the format every OCR engine accepts
    pub fn to_png(&self) -> Result<Vec<u8>, MeterError> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| MeterError::Internal(format!("Failed to encode PNG: {}", e)))?;
        Ok(buf)
    }
}

/// Decode an uploaded photo
pub fn load_image(bytes: &[u8]) -> Result<DynamicImage, MeterError> {
    if bytes.is_empty() {
        return Err(MeterError::LoadError("empty buffer".to_string()));
    }
    let image = image::load_from_memory(bytes).map_err(|e| MeterError::LoadError(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(MeterError::LoadError("image has no pixels".to_string()));
    }
    Ok(image)
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone)]
pub struct PreprocessingResult {
    pub image: NormalizedImage,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Crop, grayscale and smooth according to the configured ROI and filter
#[derive(Debug, Clone)]
pub struct Preprocessor {
    roi: RoiSpec,
    filter: FilterStrategy,
    kernel_size: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(RoiSpec::default(), FilterStrategy::default(), DEFAULT_KERNEL_SIZE)
    }
}

impl Preprocessor {
    pub fn new(roi: RoiSpec, filter: FilterStrategy, kernel_size: u32) -> Self {
        Self {
            roi,
            filter,
            kernel_size,
        }
    }

    pub fn roi(&self) -> &RoiSpec {
        &self.roi
    }

    pub fn filter(&self) -> FilterStrategy {
        self.filter
    }

    /// Produce the normalized image; the raw image is only read
    pub fn process(&self, image: &DynamicImage) -> Result<PreprocessingResult, MeterError> {
        let start = Instant::now();
        let mut timings = Vec::new();

        if image.width() == 0 || image.height() == 0 {
            return Err(MeterError::LoadError("image has no pixels".to_string()));
        }

        let rect = self.roi.crop_rect(image.width(), image.height())?;
        tracing::debug!(
            "Cropping {}x{} image to {}x{} at ({}, {})",
            image.width(),
            image.height(),
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );

        let mut img = self.run_step("crop", &mut timings, || steps::crop::apply(image, &rect));
        img = self.run_step("grayscale", &mut timings, || steps::grayscale::apply(img));

        let kernel = self.kernel_size;
        img = match self.filter {
            FilterStrategy::None => img,
            FilterStrategy::Gaussian => {
                self.run_step("gaussian", &mut timings, || steps::smooth::gaussian(img, kernel))
            }
            FilterStrategy::Box => {
                self.run_step("box", &mut timings, || steps::smooth::mean(img, kernel))
            }
            FilterStrategy::Median => {
                self.run_step("median", &mut timings, || steps::denoise::apply(img, kernel))
            }
            FilterStrategy::AdaptiveThreshold => {
                self.run_step("threshold", &mut timings, || steps::threshold::apply(img))
            }
        };

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Preprocessing ({}) finished in {}ms: {:?}",
            self.filter,
            total_time_ms,
            timings
        );

        Ok(PreprocessingResult {
            image: NormalizedImage {
                image: img.into_luma8(),
            },
            total_time_ms,
            steps: timings,
        })
    }

    fn run_step<F>(&self, name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> DynamicImage
    where
        F: FnOnce() -> DynamicImage,
    {
        let step_start = Instant::now();
        let result = step_fn();
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn photo(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        }))
    }

    #[test]
    fn test_output_matches_crop_rect() {
        let image = photo(640, 480);
        let rois = [
            RoiSpec::default(),
            RoiSpec::new(0.0, 1.0, 0.0, 1.0).unwrap(),
            RoiSpec::new(0.33, 0.34, 0.5, 0.75).unwrap(),
            RoiSpec::new(0.9, 1.0, 0.0, 0.05).unwrap(),
        ];

        for filter in [
            FilterStrategy::None,
            FilterStrategy::Gaussian,
            FilterStrategy::Box,
            FilterStrategy::Median,
            FilterStrategy::AdaptiveThreshold,
        ] {
            for roi in rois {
                let rect = roi.crop_rect(640, 480).unwrap();
                let result = Preprocessor::new(roi, filter, 3).process(&image).unwrap();
                assert_eq!(
                    (result.image.width(), result.image.height()),
                    (rect.width, rect.height),
                    "{:?} with {}",
                    roi,
                    filter
                );
            }
        }
    }

    #[test]
    fn test_inverted_roi_fails() {
        let image = photo(100, 100);
        let roi = RoiSpec {
            top: 0.6,
            bottom: 0.2,
            left: 0.1,
            right: 0.9,
        };
        let err = Preprocessor::new(roi, FilterStrategy::Gaussian, 3)
            .process(&image)
            .unwrap_err();
        assert!(matches!(err, MeterError::PreprocessError(_)));

        let roi = RoiSpec {
            top: 0.2,
            bottom: 0.6,
            left: 0.4,
            right: 0.4,
        };
        let err = Preprocessor::new(roi, FilterStrategy::Gaussian, 3)
            .process(&image)
            .unwrap_err();
        assert!(matches!(err, MeterError::PreprocessError(_)));
    }

    #[test]
    fn test_records_step_timings() {
        let result = Preprocessor::default().process(&photo(50, 50)).unwrap();
        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["crop", "grayscale", "gaussian"]);
    }

    #[test]
    fn test_none_filter_is_plain_gray_crop() {
        let image = photo(20, 10);
        let roi = RoiSpec::new(0.0, 1.0, 0.0, 1.0).unwrap();
        let result = Preprocessor::new(roi, FilterStrategy::None, 3)
            .process(&image)
            .unwrap();
        assert_eq!(result.image.as_gray(), &image.to_luma8());
    }

    #[test]
    fn test_load_image_rejects_garbage() {
        assert!(matches!(load_image(&[]), Err(MeterError::LoadError(_))));
        assert!(matches!(
            load_image(b"definitely not an image"),
            Err(MeterError::LoadError(_))
        ));
    }

    #[test]
    fn test_png_round_trip_through_loader() {
        let result = Preprocessor::default().process(&photo(120, 90)).unwrap();
        let png = result.image.to_png().unwrap();
        let decoded = load_image(&png).unwrap();
        assert_eq!(decoded.width(), result.image.width());
        assert_eq!(decoded.height(), result.image.height());
    }

    #[test]
    fn test_filter_strategy_parsing() {
        assert_eq!("Median".parse::<FilterStrategy>(), Ok(FilterStrategy::Median));
        assert_eq!(
            "adaptive-threshold".parse::<FilterStrategy>(),
            Ok(FilterStrategy::AdaptiveThreshold)
        );
        assert!("sharpen".parse::<FilterStrategy>().is_err());
    }
}
