use crate::error::MeterError;
use std::time::Duration;

/// Default OCR language
pub const DEFAULT_LANGUAGE: &str = "eng";
/// Default upper bound for a single OCR call
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-call options passed to an OCR engine
#[derive(Debug, Clone)]
pub struct OcrOptions {
    /// Recognition language (Tesseract-style code, e.g. "eng")
    pub language: String,
    /// Ask the provider to upscale small images
    pub scale: bool,
    /// Ask the provider to auto-rotate the image
    pub detect_orientation: bool,
    /// Hard limit for the whole call; local engines run to completion
    pub timeout: Duration,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            scale: true,
            detect_orientation: false,
            timeout: DEFAULT_OCR_TIMEOUT,
        }
    }
}

/// Raw text returned by an engine
#[derive(Debug, Clone, Default)]
pub struct OcrResult {
    pub text: String,
    /// 0.0-1.0 when the engine reports one
    pub confidence: Option<f32>,
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocr-space", "ocrs")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in an encoded image (PNG from the preprocessor).
    ///
    /// Transport failures, timeouts and provider-reported errors are
    /// `MeterError::OcrServiceError`. An image without text is `Ok` with empty text.
    fn submit(&self, image: &[u8], options: &OcrOptions) -> Result<OcrResult, MeterError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine that answers every call with a fixed outcome
    pub struct ScriptedEngine {
        outcome: Result<String, String>,
        calls: AtomicUsize,
    }

    impl ScriptedEngine {
        pub fn text(text: &str) -> Self {
            Self {
                outcome: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                outcome: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn description(&self) -> &'static str {
            "Returns canned text"
        }

        fn submit(&self, image: &[u8], _options: &OcrOptions) -> Result<OcrResult, MeterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if image::load_from_memory(image).is_err() {
                return Err(MeterError::OcrServiceError("not an image".to_string()));
            }
            match &self.outcome {
                Ok(text) => Ok(OcrResult {
                    text: text.clone(),
                    confidence: None,
                }),
                Err(message) => Err(MeterError::OcrServiceError(message.clone())),
            }
        }

        fn supported_languages(&self) -> Vec<String> {
            vec![DEFAULT_LANGUAGE.to_string()]
        }
    }
}
