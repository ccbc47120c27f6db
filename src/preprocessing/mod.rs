//! Image preprocessing for meter photos
//!
//! Crops the digit display out of the photo, converts it to a single channel
//! and applies a light, swappable noise filter before OCR submission.

pub mod pipeline;
pub mod roi;
pub mod steps;

pub use pipeline::{
    load_image, FilterStrategy, NormalizedImage, PreprocessingResult, Preprocessor, StepTiming,
    DEFAULT_KERNEL_SIZE,
};
pub use roi::{CropRect, RoiSpec};
