//! Meter reading OCR
//!
//! Turns a photo of an electromechanical utility meter into its register
//! value: crop and clean the digit window, hand it to an OCR engine and pick
//! the reading out of whatever text comes back.

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod extract;
pub mod preprocessing;
pub mod reader;
pub mod server;

pub use engine::{OcrEngine, OcrOptions, OcrResult};
pub use error::MeterError;
pub use extract::{Extractor, Reading, Strategy};
pub use preprocessing::{FilterStrategy, Preprocessor, RoiSpec};
pub use reader::MeterReader;
