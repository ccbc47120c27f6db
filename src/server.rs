use crate::config::Config;
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::MeterError;
use crate::extract::{Extractor, Reading};
use crate::preprocessing::{Preprocessor, RoiSpec};
use crate::reader::MeterReader;
use axum::{
    body::Bytes,
    extract::{multipart::Field, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and the small text fields
const FORM_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EngineRegistry>,
    pub extractor: Arc<Extractor>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, registry: EngineRegistry) -> Result<Self, MeterError> {
        let extractor = Extractor::new(config.digits, config.strategies.clone())?;
        Ok(Self {
            registry: Arc::new(registry),
            extractor: Arc::new(extractor),
            config: Arc::new(config),
        })
    }
}

/// Successful upload response
#[derive(Serialize)]
pub struct ReadingResponse {
    pub meter_reading: Reading,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Pipeline defaults advertised by `/info`
#[derive(Serialize)]
pub struct DefaultsInfo {
    pub roi: RoiSpec,
    pub filter: &'static str,
    pub kernel_size: u32,
    pub digits: usize,
    pub strategies: Vec<&'static str>,
    pub language: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub default_engine: String,
    pub engines: Vec<EngineInfo>,
    pub defaults: DefaultsInfo,
    pub max_file_size_bytes: usize,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size + FORM_OVERHEAD;

    Router::new()
        .route("/", get(handle_root))
        .route("/upload", post(handle_upload))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let registry = EngineRegistry::new(&config)?;
    tracing::info!(
        "Engines available: {} (default: {})",
        registry.list().join(", "),
        registry.default_name()
    );

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, registry)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Fields accepted by `/upload`
#[derive(Default)]
struct UploadForm {
    image: Option<Bytes>,
    top: Option<f64>,
    bottom: Option<f64>,
    left: Option<f64>,
    right: Option<f64>,
    engine: Option<String>,
    language: Option<String>,
}

impl UploadForm {
    async fn parse(mut multipart: Multipart, max_file_size: usize) -> Result<Self, MeterError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max_file_size))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "image" | "file" => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| multipart_error(e, max_file_size))?;
                    form.image = Some(data);
                }
                "top" => form.top = Some(fraction(&name, field).await?),
                "bottom" => form.bottom = Some(fraction(&name, field).await?),
                "left" => form.left = Some(fraction(&name, field).await?),
                "right" => form.right = Some(fraction(&name, field).await?),
                "engine" => form.engine = text(&name, field).await?,
                "language" => form.language = text(&name, field).await?,
                _ => {
                    tracing::debug!("Ignoring form field '{}'", name);
                }
            }
        }

        Ok(form)
    }

    /// ROI for this request; missing edges fall back to the configured ones
    fn roi(&self, defaults: &RoiSpec) -> Result<RoiSpec, MeterError> {
        RoiSpec::new(
            self.top.unwrap_or(defaults.top),
            self.bottom.unwrap_or(defaults.bottom),
            self.left.unwrap_or(defaults.left),
            self.right.unwrap_or(defaults.right),
        )
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError, max: usize) -> MeterError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        MeterError::ImageTooLarge {
            size: max + FORM_OVERHEAD,
            max,
        }
    } else {
        MeterError::InvalidRequest(format!("Failed to parse multipart: {}", err))
    }
}

/// Trimmed text value; blank counts as absent
async fn text(name: &str, field: Field<'_>) -> Result<Option<String>, MeterError> {
    let value = field
        .text()
        .await
        .map_err(|e| MeterError::InvalidRequest(format!("Invalid {}: {}", name, e)))?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

async fn fraction(name: &str, field: Field<'_>) -> Result<f64, MeterError> {
    let value = text(name, field)
        .await?
        .ok_or_else(|| MeterError::InvalidRequest(format!("{} is empty", name)))?;
    value
        .parse::<f64>()
        .map_err(|_| MeterError::InvalidRequest(format!("{} must be a number, got '{}'", name, value)))
}

/// Handle meter photo uploads
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ReadingResponse>, MeterError> {
    let max_file_size = state.config.max_file_size;
    let form = UploadForm::parse(multipart, max_file_size).await?;

    let roi = form.roi(&state.config.roi)?;
    let engine = state.registry.resolve(form.engine.as_deref())?;
    let data = form.image.ok_or(MeterError::MissingFile)?;

    if data.is_empty() {
        return Err(MeterError::MissingFile);
    }
    if data.len() > max_file_size {
        return Err(MeterError::ImageTooLarge {
            size: data.len(),
            max: max_file_size,
        });
    }

    let mut options = state.config.ocr_options();
    if let Some(language) = form.language {
        options.language = language;
    }

    tracing::debug!(
        "Upload of {} bytes, engine {}, ROI {:?}",
        data.len(),
        engine.name(),
        roi
    );

    let reader = MeterReader::new(
        Preprocessor::new(roi, state.config.filter, state.config.kernel_size),
        engine,
        options,
        state.extractor.clone(),
    )
    .with_debug_dir(state.config.debug_dir.clone());

    let reading = tokio::task::spawn_blocking(move || reader.read(&data))
        .await
        .map_err(|e| MeterError::Internal(format!("Reading task failed: {}", e)))??;

    Ok(Json(ReadingResponse {
        meter_reading: reading,
    }))
}

async fn handle_root() -> &'static str {
    "meter-ocr-server is running. POST a photo to /upload.\n"
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_engine: state.registry.default_name().to_string(),
        engines: state.registry.info(),
        defaults: DefaultsInfo {
            roi: config.roi,
            filter: config.filter.as_str(),
            kernel_size: config.kernel_size,
            digits: state.extractor.digits(),
            strategies: state.extractor.strategies().iter().map(|s| s.as_str()).collect(),
            language: config.language.clone(),
        },
        max_file_size_bytes: config.max_file_size,
    })
}
