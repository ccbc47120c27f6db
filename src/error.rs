use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeterError {
    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not load image: {0}")]
    LoadError(String),

    #[error("invalid crop region: {0}")]
    PreprocessError(String),

    #[error("OCR service error: {0}")]
    OcrServiceError(String),

    /// No parsing strategy produced a valid reading. Keeps the OCR text for diagnosis.
    #[error("{reason}")]
    ExtractionError { reason: String, raw_text: String },

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("No image uploaded")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown OCR engine: {0}")]
    UnknownEngine(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MeterError {
    pub fn extraction(reason: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self::ExtractionError {
            reason: reason.into(),
            raw_text: raw_text.into(),
        }
    }

    /// Machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            MeterError::InitializationError(_) => "INIT_ERROR",
            MeterError::InvalidConfig(_) => "INVALID_CONFIG",
            MeterError::LoadError(_) => "LOAD_ERROR",
            MeterError::PreprocessError(_) => "PREPROCESS_ERROR",
            MeterError::OcrServiceError(_) => "OCR_SERVICE_ERROR",
            MeterError::ExtractionError { .. } => "EXTRACTION_ERROR",
            MeterError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            MeterError::MissingFile => "MISSING_FILE",
            MeterError::InvalidRequest(_) => "INVALID_REQUEST",
            MeterError::UnknownEngine(_) => "UNKNOWN_ENGINE",
            MeterError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            MeterError::InitializationError(_)
            | MeterError::InvalidConfig(_)
            | MeterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MeterError::LoadError(_)
            | MeterError::PreprocessError(_)
            | MeterError::MissingFile
            | MeterError::InvalidRequest(_)
            | MeterError::UnknownEngine(_) => StatusCode::BAD_REQUEST,
            MeterError::OcrServiceError(_) => StatusCode::BAD_GATEWAY,
            MeterError::ExtractionError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            MeterError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl IntoResponse for MeterError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let raw_text = match &self {
            MeterError::ExtractionError { raw_text, .. } => Some(raw_text.clone()),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            raw_text,
        });

        (status, body).into_response()
    }
}
