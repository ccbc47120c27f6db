//! Individual preprocessing steps

pub mod crop;
pub mod denoise;
pub mod grayscale;
pub mod smooth;
pub mod threshold;
