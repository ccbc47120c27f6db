//! Tesseract engine implementation
//!
//! Statically linked Tesseract tuned for a meter register: the image is
//! treated as a single text line and recognition is restricted to digits.
//! Downloads tessdata (training data) automatically on first use.

use crate::config::Config;
use crate::engine::{OcrEngine, OcrOptions, OcrResult};
use crate::error::MeterError;
use tesseract_static::tesseract::Tesseract;

use super::download::{cache_dir, ensure_cached};

/// Characters a register can show, including the decimal drum separator
const DIGIT_WHITELIST: &str = "0123456789.";
/// PSM 7: treat the image as a single text line
const SINGLE_LINE_PSM: &str = "7";

pub struct LeptessEngine {
    tessdata_path: String,
    language: String,
}

impl LeptessEngine {
    pub fn new(config: &Config) -> Result<Self, MeterError> {
        let language = config.language.clone();

        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&language)?,
        };

        // Fail at startup rather than on the first upload
        Tesseract::new(Some(&tessdata_path), Some(&language)).map_err(|e| {
            MeterError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;

        tracing::info!(
            "Tesseract engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language,
        })
    }
}

impl OcrEngine for LeptessEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - single-line, digits only"
    }

    fn submit(&self, image: &[u8], options: &OcrOptions) -> Result<OcrResult, MeterError> {
        if options.language != self.language {
            return Err(MeterError::OcrServiceError(format!(
                "language '{}' is not installed (available: {})",
                options.language, self.language
            )));
        }

        let tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| MeterError::OcrServiceError(format!("Failed to create Tesseract: {}", e)))?
            .set_variable("tessedit_pageseg_mode", SINGLE_LINE_PSM)
            .map_err(|e| MeterError::OcrServiceError(format!("Failed to set page mode: {}", e)))?
            .set_variable("tessedit_char_whitelist", DIGIT_WHITELIST)
            .map_err(|e| MeterError::OcrServiceError(format!("Failed to set whitelist: {}", e)))?;

        let mut tess = tess
            .set_image_from_mem(image)
            .map_err(|e| MeterError::OcrServiceError(format!("Failed to set image: {}", e)))?
            .recognize()
            .map_err(|e| MeterError::OcrServiceError(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| MeterError::OcrServiceError(format!("Failed to get text: {}", e)))?;

        // Tesseract reports 0-100
        let confidence = tess.mean_text_conf() as f32 / 100.0;

        Ok(OcrResult {
            text: text.trim().to_string(),
            confidence: Some(confidence),
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        vec![self.language.clone()]
    }
}

/// Ensure tessdata for `language` is cached, returning the directory
fn ensure_tessdata_available(language: &str) -> Result<String, MeterError> {
    let dir = cache_dir().join("tessdata");
    let url = format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    );
    ensure_cached(&url, &dir, &format!("{}.traineddata", language))?;

    // Tesseract expects the directory, not the file
    dir.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| MeterError::InitializationError("Invalid tessdata path".to_string()))
}
