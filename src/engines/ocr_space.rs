//! OCR.space cloud engine
//!
//! Posts the normalized image as a base64 data URI to the `parse/image`
//! endpoint. Free tier keys work; the engine is only registered when a key
//! is configured.

use crate::engine::{OcrEngine, OcrOptions, OcrResult};
use crate::error::MeterError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::Value;
use ureq::Agent;

use super::transport_error;

pub const DEFAULT_URL: &str = "https://api.ocr.space/parse/image";
/// OCR.space engine 2 handles digits on photographed displays best
pub const DEFAULT_ENGINE_MODE: u8 = 2;

/// `OCRExitCode` meaning "parsed successfully"
const EXIT_PARSED: i64 = 1;

pub struct OcrSpaceEngine {
    api_key: String,
    url: String,
    engine_mode: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(rename = "OCRExitCode", default)]
    ocr_exit_code: i64,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

impl OcrSpaceEngine {
    pub fn new(api_key: impl Into<String>, url: impl Into<String>, engine_mode: u8) -> Self {
        Self {
            api_key: api_key.into(),
            url: url.into(),
            engine_mode,
        }
    }

    fn parse(status: u16, body: &str) -> Result<OcrResult, MeterError> {
        if !(200..300).contains(&status) {
            return Err(MeterError::OcrServiceError(format!(
                "OCR.space returned HTTP {}",
                status
            )));
        }

        let parsed: ParseResponse = serde_json::from_str(body).map_err(|e| {
            MeterError::OcrServiceError(format!("Malformed OCR.space response: {}", e))
        })?;

        if parsed.ocr_exit_code != EXIT_PARSED || parsed.is_errored_on_processing {
            return Err(MeterError::OcrServiceError(error_text(
                parsed.error_message.as_ref(),
            )));
        }

        let text = parsed
            .parsed_results
            .iter()
            .map(|r| r.parsed_text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(OcrResult {
            text,
            confidence: None,
        })
    }
}

/// `ErrorMessage` is either a string or a list of strings
fn error_text(message: Option<&Value>) -> String {
    match message {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        _ => "Unknown OCR error".to_string(),
    }
}

impl OcrEngine for OcrSpaceEngine {
    fn name(&self) -> &'static str {
        "ocr-space"
    }

    fn description(&self) -> &'static str {
        "OCR.space cloud API"
    }

    fn submit(&self, image: &[u8], options: &OcrOptions) -> Result<OcrResult, MeterError> {
        let data_uri = format!("data:image/png;base64,{}", STANDARD.encode(image));
        let engine_mode = self.engine_mode.to_string();

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(options.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        let mut response = agent
            .post(&self.url)
            .send_form([
                ("apikey", self.api_key.as_str()),
                ("language", options.language.as_str()),
                ("scale", bool_flag(options.scale)),
                ("detectOrientation", bool_flag(options.detect_orientation)),
                ("isOverlayRequired", "false"),
                ("OCREngine", engine_mode.as_str()),
                ("base64Image", data_uri.as_str()),
            ])
            .map_err(|e| transport_error("OCR.space", e, options))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| transport_error("OCR.space", e, options))?;

        tracing::debug!("OCR.space status: {}, body length: {}", status, body.len());

        Self::parse(status, &body)
    }

    fn supported_languages(&self) -> Vec<String> {
        ["eng", "ger", "fre", "spa", "ita", "por", "dut", "rus", "jpn", "chs", "kor", "ara"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

fn bool_flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
