use image::{DynamicImage, ImageFormat, RgbImage};
use meter_ocr::config::Config;
use meter_ocr::engines::ocr_space::OcrSpaceEngine;
use meter_ocr::engines::EngineRegistry;
use meter_ocr::server::{router, AppState};
use meter_ocr::{MeterError, OcrEngine, OcrOptions, OcrResult};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct ReadingResponse {
    meter_reading: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ErrorResponse {
    error: String,
    code: String,
    raw_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EngineInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct InfoResponse {
    version: String,
    default_engine: String,
    engines: Vec<EngineInfo>,
    max_file_size_bytes: usize,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Engine that always reports the same text
struct FixedText {
    name: &'static str,
    text: &'static str,
}

impl OcrEngine for FixedText {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "Fixed text for tests"
    }

    fn submit(&self, _image: &[u8], _options: &OcrOptions) -> Result<OcrResult, MeterError> {
        Ok(OcrResult {
            text: self.text.to_string(),
            confidence: Some(1.0),
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["eng".to_string()]
    }
}

/// In-process server on an ephemeral port
struct TestServer {
    addr: std::net::SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start(engines: Vec<Arc<dyn OcrEngine>>) -> Self {
        let registry = EngineRegistry::from_engines(engines, None).expect("registry");
        let state = AppState::new(Config::default(), registry).expect("state");
        let app = router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, handle }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn meter_photo() -> Vec<u8> {
    // Dark drums on a light face, roughly where the default ROI looks
    let img = RgbImage::from_fn(400, 300, |x, y| {
        let in_window = (60..340).contains(&x) && (70..170).contains(&y);
        if in_window && (x / 40) % 2 == 0 {
            image::Rgb([25, 25, 30])
        } else {
            image::Rgb([235, 232, 225])
        }
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode fixture");
    out.into_inner()
}

fn photo_form(field: &str) -> Form {
    let part = Part::bytes(meter_photo())
        .file_name("meter.png")
        .mime_str("image/png")
        .unwrap();
    Form::new().part(field.to_string(), part)
}

async fn upload(server: &TestServer, form: Form) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/upload", server.base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start(vec![Arc::new(FixedText {
        name: "fixed",
        text: "15709",
    })])
    .await;

    let response: HealthResponse = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(response.status, "ok");
}

#[tokio::test]
async fn test_upload_reads_meter() {
    let server = TestServer::start(vec![Arc::new(FixedText {
        name: "fixed",
        text: "SHANGHAI ELECTRIC METER\n15709.\nkW-h 220V 50Hz",
    })])
    .await;

    let response = upload(&server, photo_form("image")).await;
    assert!(response.status().is_success());

    let body: ReadingResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(body.meter_reading, "15709");
}

#[tokio::test]
async fn test_engine_selected_per_request() {
    let server = TestServer::start(vec![
        Arc::new(FixedText {
            name: "first",
            text: "no digits here",
        }),
        Arc::new(FixedText {
            name: "second",
            text: "0 2 4 6 8",
        }),
    ])
    .await;

    let response = upload(&server, photo_form("file").text("engine", "second")).await;
    assert!(response.status().is_success());
    let body: ReadingResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(body.meter_reading, "02468");

    let response = upload(&server, photo_form("file")).await;
    assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(body.code, "EXTRACTION_ERROR");
    assert_eq!(body.raw_text.as_deref(), Some("no digits here"));
}

#[tokio::test]
async fn test_info_endpoint() {
    let server = TestServer::start(vec![Arc::new(FixedText {
        name: "fixed",
        text: "15709",
    })])
    .await;

    let response: InfoResponse = reqwest::get(format!("{}/info", server.base_url()))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert!(!response.version.is_empty());
    assert_eq!(response.default_engine, "fixed");
    assert_eq!(response.engines.len(), 1);
    assert_eq!(response.engines[0].name, "fixed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_through_ocr_space() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse/image"))
        .and(body_string_contains("apikey=test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ParsedResults": [{ "ParsedText": "1 5 7 0 9\r\n", "FileParseExitCode": 1 }],
            "OCRExitCode": 1,
            "IsErroredOnProcessing": false
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let engine = OcrSpaceEngine::new("test-key", format!("{}/parse/image", provider.uri()), 2);
    let server = TestServer::start(vec![Arc::new(engine)]).await;

    let response = upload(&server, photo_form("image")).await;
    assert!(response.status().is_success());
    let body: ReadingResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(body.meter_reading, "15709");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ocr_space_outage_is_bad_gateway() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&provider)
        .await;

    let engine = OcrSpaceEngine::new("test-key", format!("{}/parse/image", provider.uri()), 2);
    let server = TestServer::start(vec![Arc::new(engine)]).await;

    let response = upload(&server, photo_form("image")).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(body.code, "OCR_SERVICE_ERROR");
}
