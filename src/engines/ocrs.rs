//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use crate::engine::{OcrEngine, OcrOptions, OcrResult};
use crate::error::MeterError;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;

use super::download::{cache_dir, ensure_cached};

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Load models (downloading them if needed) and build the engine
    pub fn new() -> Result<Self, MeterError> {
        tracing::info!("Initializing ocrs OCR engine...");

        let models = cache_dir().join("models");
        let detection_model_path =
            ensure_cached(DETECTION_MODEL_URL, &models, "text-detection.rten")?;
        let recognition_model_path =
            ensure_cached(RECOGNITION_MODEL_URL, &models, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            MeterError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            MeterError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            MeterError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }

    /// Text of every detected line, words separated by single spaces
    fn recognize_lines(&self, png: &[u8]) -> Result<Vec<String>, MeterError> {
        let failed = |stage: &str, e: &dyn std::fmt::Display| {
            MeterError::OcrServiceError(format!("ocrs {} failed: {}", stage, e))
        };

        // The normalized image is grayscale; ocrs takes RGB8 in HWC layout
        let rgb = image::load_from_memory(png)
            .map_err(|e| failed("decode", &e))?
            .into_rgb8();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| failed("image source", &e))?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| failed("input preparation", &e))?;
        let words = self
            .engine
            .detect_words(&input)
            .map_err(|e| failed("word detection", &e))?;
        let line_rects = self.engine.find_text_lines(&input, &words);
        let recognized = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|e| failed("recognition", &e))?;

        Ok(recognized
            .into_iter()
            .flatten()
            .map(|line| line.words().map(|w| w.to_string()).collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect())
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - runs locally, no API key required"
    }

    fn submit(&self, image: &[u8], _options: &OcrOptions) -> Result<OcrResult, MeterError> {
        let lines = self.recognize_lines(image)?;
        tracing::debug!("ocrs recognized {} lines", lines.len());

        Ok(OcrResult {
            text: lines.join("\n"),
            confidence: None,
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        // ocrs currently only supports English/Latin alphabet
        vec!["eng".to_string()]
    }
}
