//! OCR engine implementations
//!
//! Cloud engines are always compiled and registered when their API key is
//! configured. Local engines are conditionally compiled based on feature flags.

pub mod download;
pub mod google_vision;
pub mod ocr_space;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::{OcrEngine, OcrOptions};
use crate::error::MeterError;
use serde::Serialize;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_languages: Vec<String>,
}

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a registry with every engine the configuration enables
    pub fn new(config: &Config) -> Result<Self, MeterError> {
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

        if let Some(key) = &config.ocr_space.api_key {
            tracing::info!("Registering OCR.space engine ({})", config.ocr_space.url);
            engines.push(Arc::new(ocr_space::OcrSpaceEngine::new(
                key.clone(),
                config.ocr_space.url.clone(),
                config.ocr_space.engine_mode,
            )));
        }

        if let Some(key) = &config.google_vision.api_key {
            tracing::info!("Registering Google Vision engine ({})", config.google_vision.url);
            engines.push(Arc::new(google_vision::GoogleVisionEngine::new(
                key.clone(),
                config.google_vision.url.clone(),
            )));
        }

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Initializing ocrs engine...");
            match ocrs::OcrsEngine::new() {
                Ok(engine) => engines.push(Arc::new(engine)),
                Err(e) => tracing::warn!("Skipping ocrs engine: {}", e),
            }
        }

        #[cfg(feature = "engine-leptess")]
        {
            tracing::info!("Initializing tesseract engine...");
            match leptess::LeptessEngine::new(config) {
                Ok(engine) => engines.push(Arc::new(engine)),
                Err(e) => tracing::warn!("Skipping tesseract engine: {}", e),
            }
        }

        Self::from_engines(engines, config.default_engine.as_deref())
    }

    /// Build from already constructed engines. Without an explicit default
    /// the first engine wins.
    pub fn from_engines(
        engines: Vec<Arc<dyn OcrEngine>>,
        default_engine: Option<&str>,
    ) -> Result<Self, MeterError> {
        if engines.is_empty() {
            return Err(MeterError::InitializationError(
                "No OCR engines available. Set OCR_API_KEY or GOOGLE_VISION_API_KEY, or build with --features engine-ocrs / engine-leptess".to_string(),
            ));
        }

        let default_engine = match default_engine {
            Some(name) => {
                if !engines.iter().any(|e| e.name() == name) {
                    return Err(MeterError::InitializationError(format!(
                        "Default engine '{}' is not available (have: {})",
                        name,
                        engines.iter().map(|e| e.name()).collect::<Vec<_>>().join(", ")
                    )));
                }
                name.to_string()
            }
            None => engines[0].name().to_string(),
        };

        Ok(Self {
            engines,
            default_engine,
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Engine by name, or the default when no name is given
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn OcrEngine>, MeterError> {
        let name = name.unwrap_or(&self.default_engine);
        self.get(name)
            .ok_or_else(|| MeterError::UnknownEngine(name.to_string()))
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
                supported_languages: e.supported_languages(),
            })
            .collect()
    }
}

/// Map a ureq failure from a cloud engine, calling out timeouts explicitly
pub(crate) fn transport_error(provider: &str, err: ureq::Error, options: &OcrOptions) -> MeterError {
    match err {
        ureq::Error::Timeout(_) => MeterError::OcrServiceError(format!(
            "{} did not answer within {}s",
            provider,
            options.timeout.as_secs_f32()
        )),
        other => MeterError::OcrServiceError(format!("{} request failed: {}", provider, other)),
    }
}
