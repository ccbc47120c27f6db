//! Reading extraction from raw OCR text
//!
//! OCR output from a meter photo is noisy: stray punctuation, the maker's
//! name, multiplier markings such as `10^4`. The [`Extractor`] strips known
//! noise characters and runs an ordered cascade of [`Strategy`] parsers,
//! returning the first reading that validates.

pub mod strategy;

pub use strategy::{Patterns, Strategy};

use crate::error::MeterError;
use serde::Serialize;
use std::fmt;

/// Digits on a standard electromechanical register
pub const DEFAULT_DIGITS: usize = 5;

/// Placeholder strings older OCR call layers return instead of text
pub const FAILURE_SENTINELS: &[&str] = &["Preprocessing failed", "OCR failed", "API error"];

/// Characters OCR engines commonly hallucinate around drum digits
const NOISE_CHARS: &[char] = &[
    '\u{2022}', // •
    '\u{00B7}', // ·
    '*',
    '?',
    '\'',
    '"',
    '\u{2018}', // ‘
    '\u{2019}', // ’
    '\u{201C}', // “
    '\u{201D}', // ”
];

/// Validated meter reading: exactly N ASCII digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Reading(String);

impl Reading {
    /// Returns `None` unless `digits` is exactly `width` ASCII digits
    pub fn new(digits: impl Into<String>, width: usize) -> Option<Self> {
        let digits = digits.into();
        if width > 0 && digits.len() == width && digits.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(digits))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runs the strategy cascade for a fixed reading width
#[derive(Debug, Clone)]
pub struct Extractor {
    patterns: Patterns,
    strategies: Vec<Strategy>,
}

impl Extractor {
    pub fn new(digits: usize, strategies: Vec<Strategy>) -> Result<Self, MeterError> {
        if digits == 0 {
            return Err(MeterError::InvalidConfig(
                "expected digit count must be at least 1".to_string(),
            ));
        }
        if strategies.is_empty() {
            return Err(MeterError::InvalidConfig(
                "at least one extraction strategy is required".to_string(),
            ));
        }

        let patterns = Patterns::new(digits).map_err(|e| {
            MeterError::InvalidConfig(format!("cannot build {}-digit patterns: {}", digits, e))
        })?;

        Ok(Self {
            patterns,
            strategies,
        })
    }

    /// Five digits, spaced → contiguous → pool
    pub fn with_defaults() -> Result<Self, MeterError> {
        Self::new(DEFAULT_DIGITS, Strategy::default_order())
    }

    pub fn digits(&self) -> usize {
        self.patterns.width()
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn extract(&self, ocr_text: &str) -> Result<Reading, MeterError> {
        self.extract_with_strategy(ocr_text)
            .map(|(reading, _)| reading)
    }

    /// Like [`Extractor::extract`], also reporting which strategy matched
    pub fn extract_with_strategy(&self, ocr_text: &str) -> Result<(Reading, Strategy), MeterError> {
        let cleaned = strip_noise(ocr_text);
        if cleaned.trim().is_empty() || FAILURE_SENTINELS.contains(&ocr_text.trim()) {
            return Err(MeterError::extraction("no text", ocr_text));
        }

        for strategy in &self.strategies {
            if let Some(reading) = strategy.apply(&cleaned, &self.patterns) {
                tracing::debug!("Strategy '{}' matched reading {}", strategy, reading);
                return Ok((reading, *strategy));
            }
        }

        Err(MeterError::extraction(
            format!("no {}-digit reading found", self.digits()),
            ocr_text,
        ))
    }
}

/// Drop the noise characters, keeping everything else in place
pub fn strip_noise(text: &str) -> String {
    text.chars().filter(|c| !NOISE_CHARS.contains(c)).collect()
}
