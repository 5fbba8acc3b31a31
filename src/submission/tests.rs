use super::*;
use crate::asset::{encode_for_transport, AssetOrigin, ImageAsset};
use crate::config::ServiceConfig;
use crate::error::{AssetError, SubmissionError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0xFF, 0xD9];

#[derive(Debug, Clone)]
struct ReceivedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

type Received = Arc<Mutex<Vec<ReceivedPart>>>;

async fn record_parts(received: &Received, mut multipart: Multipart) {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        received.lock().push(ReceivedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
}

async fn scan_ok(State(received): State<Received>, multipart: Multipart) -> Json<Value> {
    record_parts(&received, multipart).await;
    Json(json!({
        "status": "success",
        "head_rice": 120,
        "broken_rice": 8,
        "total_grains": 128,
        "percentage": 93.75,
        "grade": "Premium",
        "processed_image": encode_for_transport(&[1, 2, 3], "image/png"),
    }))
}

async fn scan_in_band_error(State(received): State<Received>, multipart: Multipart) -> Json<Value> {
    record_parts(&received, multipart).await;
    Json(json!({ "status": "error", "message": "File gambar tidak valid" }))
}

async fn scan_unavailable(State(received): State<Received>, multipart: Multipart) -> StatusCode {
    record_parts(&received, multipart).await;
    StatusCode::SERVICE_UNAVAILABLE
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Grain-O-Meter Server is Running!" }))
}

async fn spawn_grader(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn service_config(url: String) -> ServiceConfig {
    ServiceConfig {
        url,
        scan_path: "/scan".to_string(),
        timeout_seconds: 5,
    }
}

fn file_asset() -> ImageAsset {
    ImageAsset::from_bytes(JPEG_BYTES.to_vec(), "image/jpeg", AssetOrigin::File)
}

#[tokio::test]
async fn test_http_submission_sends_single_file_part() {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/scan", post(scan_ok))
        .with_state(Arc::clone(&received));
    let url = spawn_grader(app).await;

    let service = HttpGradingService::new(&service_config(url)).unwrap();
    let pipeline = SubmissionPipeline::new(Arc::new(service));

    let camera_asset = ImageAsset::from_transport(
        encode_for_transport(JPEG_BYTES, "image/jpeg"),
        AssetOrigin::Camera,
    )
    .unwrap();
    let result = pipeline.submit(&camera_asset).await.unwrap();

    assert_eq!(result.head_rice_count, 120);
    assert_eq!(result.broken_rice_count, 8);
    assert_eq!(result.total_grains, Some(128));
    assert_eq!(result.grade, "Premium");
    assert_eq!(result.head_rice_percentage, 93.75);

    let annotated = result.annotated_image.unwrap();
    assert_eq!(annotated.origin(), AssetOrigin::Service);
    assert_eq!(annotated.to_bytes().unwrap().as_ref(), &[1, 2, 3]);

    let parts = received.lock().clone();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].name, UPLOAD_FIELD);
    assert_eq!(parts[0].file_name.as_deref(), Some("snapshot.jpg"));
    assert_eq!(parts[0].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(parts[0].bytes, JPEG_BYTES);
}

#[tokio::test]
async fn test_non_success_status_is_transmission_error() {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/scan", post(scan_unavailable))
        .with_state(Arc::clone(&received));
    let url = spawn_grader(app).await;

    let pipeline = SubmissionPipeline::new(Arc::new(
        HttpGradingService::new(&service_config(url)).unwrap(),
    ));
    let err = pipeline.submit(&file_asset()).await.unwrap_err();

    match err {
        SubmissionError::Transmission { status, .. } => assert_eq!(status, Some(503)),
        other => panic!("Expected transmission error, got {:?}", other),
    }
    assert_eq!(received.lock().len(), 1);
}

#[tokio::test]
async fn test_in_band_error_is_transmission_error() {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/scan", post(scan_in_band_error))
        .with_state(Arc::clone(&received));
    let url = spawn_grader(app).await;

    let pipeline = SubmissionPipeline::new(Arc::new(
        HttpGradingService::new(&service_config(url)).unwrap(),
    ));
    let err = pipeline.submit(&file_asset()).await.unwrap_err();

    assert!(matches!(err, SubmissionError::Transmission { .. }));
    assert!(err.to_string().contains("File gambar tidak valid"));
}

#[tokio::test]
async fn test_unreachable_service_is_transmission_error() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let pipeline = SubmissionPipeline::new(Arc::new(
        HttpGradingService::new(&service_config(url)).unwrap(),
    ));
    let err = pipeline.submit(&file_asset()).await.unwrap_err();
    assert!(matches!(err, SubmissionError::Transmission { status: None, .. }));
}

#[tokio::test]
async fn test_health_check() {
    let app = Router::new().route("/", get(root));
    let url = spawn_grader(app).await;

    let service = HttpGradingService::new(&service_config(url)).unwrap();
    assert!(service.health_check().await);
    assert_eq!(service.scan_url().rsplit('/').next(), Some("scan"));
}

#[tokio::test]
async fn test_malformed_asset_never_reaches_service() {
    let service = Arc::new(MockGradingService::new());
    let pipeline = SubmissionPipeline::new(service.clone());

    let corrupt = ImageAsset::from_transport("data:image/jpeg;base64,***", AssetOrigin::Camera).unwrap();
    let err = pipeline.submit(&corrupt).await.unwrap_err();

    assert!(matches!(
        err,
        SubmissionError::MalformedAsset(AssetError::Malformed { .. })
    ));
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_file_upload_keeps_original_name() {
    let service = Arc::new(MockGradingService::new());
    let pipeline = SubmissionPipeline::new(service.clone());

    let asset = file_asset().with_file_name("batch-07.jpeg");
    pipeline.submit(&asset).await.unwrap();

    let uploads = service.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].file_name, "batch-07.jpeg");
    assert_eq!(uploads[0].mime_type, "image/jpeg");
    assert_eq!(uploads[0].bytes, JPEG_BYTES);
}

#[tokio::test]
async fn test_values_are_passed_through_unvalidated() {
    let service = Arc::new(MockGradingService::new().respond_with(ScanResponse {
        percentage: Some(140.0),
        ..scan_success(3, 0, "PREMIUM", 0.0)
    }));
    let pipeline = SubmissionPipeline::new(service);

    let result = pipeline.submit(&file_asset()).await.unwrap();
    assert_eq!(result.head_rice_percentage, 140.0);
}

#[test]
fn test_missing_fields_are_rejected() {
    let response = ScanResponse {
        grade: None,
        ..scan_success(1, 1, "MEDIUM / STANDAR", 50.0)
    };
    let err = AnalysisResult::try_from(response).unwrap_err();
    assert!(err.to_string().contains("grade"));
}

#[test]
fn test_response_deserializes_service_body() {
    let body = r#"{"status":"success","head_rice":10,"broken_rice":2,"total_grains":12,"percentage":83.33,"grade":"MEDIUM / STANDAR"}"#;
    let response: ScanResponse = serde_json::from_str(body).unwrap();
    let result = AnalysisResult::try_from(response).unwrap();
    assert_eq!(result.grade, "MEDIUM / STANDAR");
    assert!(result.annotated_image.is_none());
}

#[tokio::test]
async fn test_mock_health_and_scripted_failure() {
    let service = MockGradingService::new()
        .unhealthy()
        .fail_with(SubmissionError::transmission("timed out"));
    assert!(!service.health_check().await);

    let pipeline = SubmissionPipeline::new(Arc::new(service));
    let err = pipeline.submit(&file_asset()).await.unwrap_err();
    assert_eq!(err, SubmissionError::transmission("timed out"));

    // Script exhausted: falls back to the default body
    let result = pipeline.submit(&file_asset()).await.unwrap();
    assert_eq!(result.grade, "PREMIUM");
}
