//! One meter photo in, one reading out
//!
//! [`MeterReader`] wires the preprocessor, an OCR engine and the extractor
//! together for a single invocation. It is cheap to build per request and
//! holds nothing that outlives the call.

use crate::engine::{OcrEngine, OcrOptions};
use crate::error::MeterError;
use crate::extract::{Extractor, Reading};
use crate::preprocessing::{load_image, Preprocessor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub struct MeterReader {
    preprocessor: Preprocessor,
    engine: Arc<dyn OcrEngine>,
    options: OcrOptions,
    extractor: Arc<Extractor>,
    debug_dir: Option<PathBuf>,
}

impl MeterReader {
    pub fn new(
        preprocessor: Preprocessor,
        engine: Arc<dyn OcrEngine>,
        options: OcrOptions,
        extractor: Arc<Extractor>,
    ) -> Self {
        Self {
            preprocessor,
            engine,
            options,
            extractor,
            debug_dir: None,
        }
    }

    /// Keep a copy of every normalized image in `dir`
    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    /// Run the whole pipeline on an encoded photo
    pub fn read(&self, bytes: &[u8]) -> Result<Reading, MeterError> {
        let start = Instant::now();

        let raw = load_image(bytes)?;
        let prepared = self.preprocessor.process(&raw)?;
        let png = prepared.image.to_png()?;

        if let Some(dir) = &self.debug_dir {
            save_debug_image(dir, &png);
        }

        let ocr = self.engine.submit(&png, &self.options)?;
        tracing::debug!(
            "{} returned {} chars (confidence: {:?})",
            self.engine.name(),
            ocr.text.len(),
            ocr.confidence
        );

        let reading = self.extractor.extract(&ocr.text).inspect_err(|e| {
            if let MeterError::ExtractionError { raw_text, .. } = e {
                tracing::warn!("{}; OCR text was {:?}", e, raw_text);
            }
        })?;

        tracing::info!(
            "Read {} with {} in {}ms (preprocessing {}ms)",
            reading,
            self.engine.name(),
            start.elapsed().as_millis(),
            prepared.total_time_ms
        );

        Ok(reading)
    }
}

/// Best effort; a failed write never fails the reading
fn save_debug_image(dir: &Path, png: &[u8]) {
    let result = std::fs::create_dir_all(dir)
        .and_then(|_| {
            tempfile::Builder::new()
                .prefix("normalized-")
                .suffix(".png")
                .tempfile_in(dir)
        })
        .and_then(|mut file| {
            use std::io::Write;
            file.write_all(png)?;
            file.keep().map_err(|e| e.error)
        });

    match result {
        Ok((_, path)) => tracing::debug!("Saved normalized image to {}", path.display()),
        Err(e) => tracing::warn!("Could not save debug image in {}: {}", dir.display(), e),
    }
}
