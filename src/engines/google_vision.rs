//! Google Cloud Vision engine (`images:annotate` with `TEXT_DETECTION`)

use crate::engine::{OcrEngine, OcrOptions, OcrResult};
use crate::error::MeterError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::json;
use ureq::Agent;

use super::transport_error;

pub const DEFAULT_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

pub struct GoogleVisionEngine {
    api_key: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<Status>,
}

impl GoogleVisionEngine {
    pub fn new(api_key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: url.into(),
        }
    }

    fn payload(image: &[u8], options: &OcrOptions) -> serde_json::Value {
        let mut request = json!({
            "image": { "content": STANDARD.encode(image) },
            "features": [{ "type": "TEXT_DETECTION" }]
        });
        if let Some(hint) = language_hint(&options.language) {
            request["imageContext"] = json!({ "languageHints": [hint] });
        }
        json!({ "requests": [request] })
    }

    fn parse(status: u16, body: &str) -> Result<OcrResult, MeterError> {
        if !(200..300).contains(&status) {
            let detail = serde_json::from_str::<ErrorEnvelope>(body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| format!(": {}", e.message))
                .unwrap_or_default();
            return Err(MeterError::OcrServiceError(format!(
                "Vision API returned HTTP {}{}",
                status, detail
            )));
        }

        let parsed: AnnotateResponse = serde_json::from_str(body).map_err(|e| {
            MeterError::OcrServiceError(format!("Malformed Vision API response: {}", e))
        })?;

        let Some(first) = parsed.responses.into_iter().next() else {
            return Err(MeterError::OcrServiceError(
                "Vision API returned no responses".to_string(),
            ));
        };

        if let Some(err) = first.error {
            return Err(MeterError::OcrServiceError(format!(
                "Vision API error {}: {}",
                err.code, err.message
            )));
        }

        // The first annotation is the full text block; the rest are single words
        let text = first
            .text_annotations
            .into_iter()
            .next()
            .map(|a| a.description)
            .unwrap_or_default();

        Ok(OcrResult {
            text,
            confidence: None,
        })
    }
}

/// Vision wants BCP-47 hints, configuration uses Tesseract codes
fn language_hint(language: &str) -> Option<&'static str> {
    match language {
        "eng" => Some("en"),
        "deu" | "ger" => Some("de"),
        "fra" | "fre" => Some("fr"),
        "spa" => Some("es"),
        "ita" => Some("it"),
        "por" => Some("pt"),
        "nld" | "dut" => Some("nl"),
        "rus" => Some("ru"),
        "chi_sim" | "chs" => Some("zh"),
        _ => None,
    }
}

impl OcrEngine for GoogleVisionEngine {
    fn name(&self) -> &'static str {
        "google-vision"
    }

    fn description(&self) -> &'static str {
        "Google Cloud Vision text detection"
    }

    fn submit(&self, image: &[u8], options: &OcrOptions) -> Result<OcrResult, MeterError> {
        let payload = Self::payload(image, options).to_string();

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(options.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        let mut response = agent
            .post(&self.url)
            .query("key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(payload.as_bytes())
            .map_err(|e| transport_error("Vision API", e, options))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| transport_error("Vision API", e, options))?;

        tracing::debug!("Vision API status: {}, body length: {}", status, body.len());

        Self::parse(status, &body)
    }

    fn supported_languages(&self) -> Vec<String> {
        ["eng", "deu", "fra", "spa", "ita", "por", "nld", "rus", "chi_sim"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}
