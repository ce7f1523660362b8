use super::*;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Multipart, State};
use axum::http::StatusCode as AxumStatus;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::session::{ARTIFACT_MIME, Artifact};

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn service_at(addr: SocketAddr) -> TranscriptionService {
    TranscriptionService::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap()
}

fn artifact(bytes: Vec<u8>) -> Artifact {
    Artifact {
        bytes,
        mime: ARTIFACT_MIME,
        sample_rate: 16000,
        channels: 1,
    }
}

/// One observed multipart field: (name, filename, content_type, bytes).
type SeenField = (String, Option<String>, Option<String>, Vec<u8>);

async fn capture_fields(
    State(seen): State<Arc<std::sync::Mutex<Vec<SeenField>>>>,
    mut multipart: Multipart,
) -> Json<Value> {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        seen.lock().unwrap().push((name, filename, content_type, bytes));
    }
    Json(json!({ "transcription": "ok", "error": false }))
}

#[tokio::test]
async fn test_transcribe_artifact_success() {
    let router = Router::new().route(
        "/record",
        post(|| async {
            Json(json!({
                "transcription": "hello world",
                "duration": 1.25,
                "sample_rate": 16000,
                "method": "Wav2Vec2",
                "error": false,
                "timestamp": "2026-08-07 12:00:00",
            }))
        }),
    );
    let service = service_at(serve(router).await);

    let result = service
        .transcribe_artifact(&artifact(vec![1, 2, 3]), Method::Wav2vec2)
        .await
        .unwrap();

    assert_eq!(result.text, "hello world");
    assert_eq!(result.duration_secs, Some(1.25));
    assert_eq!(result.sample_rate, Some(16000));
    assert_eq!(result.method.as_deref(), Some("Wav2Vec2"));
}

#[tokio::test]
async fn test_transcribe_artifact_sends_audio_and_method_fields() {
    let seen: Arc<std::sync::Mutex<Vec<SeenField>>> = Arc::default();
    let router = Router::new()
        .route("/record", post(capture_fields))
        .with_state(seen.clone());
    let service = service_at(serve(router).await);

    service
        .transcribe_artifact(&artifact(vec![7, 8, 9]), Method::Google)
        .await
        .unwrap();

    let fields = seen.lock().unwrap().clone();
    assert_eq!(fields.len(), 2);

    let (name, filename, content_type, bytes) = &fields[0];
    assert_eq!(name, "audio");
    assert_eq!(filename.as_deref(), Some("recording.wav"));
    assert_eq!(content_type.as_deref(), Some("audio/wav"));
    assert_eq!(bytes, &vec![7, 8, 9]);

    let (name, _, _, bytes) = &fields[1];
    assert_eq!(name, "method");
    assert_eq!(bytes, b"google");
}

#[tokio::test]
async fn test_server_error_message_preferred() {
    let router = Router::new().route(
        "/record",
        post(|| async { Json(json!({ "error": "too loud" })) }),
    );
    let service = service_at(serve(router).await);

    let err = service
        .transcribe_artifact(&artifact(vec![0]), Method::Wav2vec2)
        .await
        .unwrap_err();

    match err {
        SubmitError::Server(message) => assert!(message.contains("too loud")),
        other => panic!("Expected Server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_field_wins_over_success_status() {
    // HTTP 200 with a truthy error field is still a failure.
    let router = Router::new().route(
        "/record",
        post(|| async {
            Json(json!({ "transcription": "ignored", "error": "engine offline" }))
        }),
    );
    let service = service_at(serve(router).await);

    let err = service
        .transcribe_artifact(&artifact(vec![0]), Method::Wav2vec2)
        .await
        .unwrap_err();

    assert!(matches!(&err, SubmitError::Server(_)));
    assert!(err.to_string().contains("engine offline"));
}

#[tokio::test]
async fn test_boolean_error_uses_generic_message() {
    let router = Router::new().route(
        "/record",
        post(|| async { Json(json!({ "transcription": "garbled", "error": true })) }),
    );
    let service = service_at(serve(router).await);

    let err = service
        .transcribe_artifact(&artifact(vec![0]), Method::Wav2vec2)
        .await
        .unwrap_err();

    match err {
        SubmitError::Server(message) => assert!(message.contains("reported an error")),
        other => panic!("Expected Server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_failure_status_without_error_field() {
    let router = Router::new().route(
        "/record",
        post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, Json(json!({}))) }),
    );
    let service = service_at(serve(router).await);

    let err = service
        .transcribe_artifact(&artifact(vec![0]), Method::Wav2vec2)
        .await
        .unwrap_err();

    match err {
        SubmitError::Server(message) => assert!(message.contains("500")),
        other => panic!("Expected Server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_transport_error() {
    let router = Router::new().route("/record", post(|| async { "not json" }));
    let service = service_at(serve(router).await);

    let err = service
        .transcribe_artifact(&artifact(vec![0]), Method::Wav2vec2)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::Transport(_)));
}

#[tokio::test]
async fn test_reply_with_neither_field_is_malformed() {
    let router = Router::new().route("/record", post(|| async { Json(json!({})) }));
    let service = service_at(serve(router).await);

    let err = service
        .transcribe_artifact(&artifact(vec![0]), Method::Wav2vec2)
        .await
        .unwrap_err();

    match err {
        SubmitError::Transport(message) => assert!(message.contains("neither")),
        other => panic!("Expected Transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Bind and immediately drop the listener so nothing is serving.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = service_at(addr);
    let err = service
        .transcribe_artifact(&artifact(vec![0]), Method::Wav2vec2)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::Transport(_)));
}

#[tokio::test]
async fn test_stalled_request_times_out() {
    let router = Router::new().route(
        "/record",
        post(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Json(json!({ "transcription": "late" }))
        }),
    );
    let addr = serve(router).await;

    let service =
        TranscriptionService::new(format!("http://{addr}"), Duration::from_millis(50)).unwrap();
    let err = service
        .transcribe_artifact(&artifact(vec![0]), Method::Wav2vec2)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::Transport(_)));
}

#[tokio::test]
async fn test_transcribe_file_success() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clip.wav");
    std::fs::write(&path, b"RIFFdata").unwrap();

    let seen: Arc<std::sync::Mutex<Vec<SeenField>>> = Arc::default();
    let router = Router::new()
        .route("/api/transcribe", post(capture_fields))
        .with_state(seen.clone());
    let service = service_at(serve(router).await);

    let result = service.transcribe_file(&path, Method::Wav2vec2).await.unwrap();
    assert_eq!(result.text, "ok");

    let fields = seen.lock().unwrap().clone();
    let (name, filename, _, bytes) = &fields[0];
    assert_eq!(name, "file");
    assert_eq!(filename.as_deref(), Some("clip.wav"));
    assert_eq!(bytes, b"RIFFdata");
}

#[tokio::test]
async fn test_oversized_file_never_reaches_network() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("big.wav");
    std::fs::write(&path, vec![0u8; (MAX_UPLOAD_BYTES + 1) as usize]).unwrap();

    let requests = Arc::new(AtomicUsize::new(0));
    let counter = requests.clone();
    let router = Router::new().route(
        "/api/transcribe",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "transcription": "ok" }))
            }
        }),
    );
    let service = service_at(serve(router).await);

    let err = service.transcribe_file(&path, Method::Wav2vec2).await.unwrap_err();

    match err {
        SubmitError::Validation(message) => assert!(message.contains("16 MB")),
        other => panic!("Expected Validation error, got {other:?}"),
    }
    assert_eq!(requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unsupported_extension_rejected_locally() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.txt");
    std::fs::write(&path, b"hello").unwrap();

    let service = service_at("127.0.0.1:1".parse().unwrap());
    let err = service.transcribe_file(&path, Method::Wav2vec2).await.unwrap_err();

    assert!(matches!(err, SubmitError::Validation(_)));
}

#[tokio::test]
async fn test_missing_file_rejected_locally() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing.wav");

    let service = service_at("127.0.0.1:1".parse().unwrap());
    let err = service.transcribe_file(&path, Method::Wav2vec2).await.unwrap_err();

    assert!(matches!(err, SubmitError::Validation(_)));
}

#[tokio::test]
async fn test_extension_check_is_case_insensitive() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clip.WAV");
    std::fs::write(&path, b"data").unwrap();

    let router = Router::new().route(
        "/api/transcribe",
        post(|| async { Json(json!({ "transcription": "ok" })) }),
    );
    let service = service_at(serve(router).await);

    assert!(service.transcribe_file(&path, Method::Wav2vec2).await.is_ok());
}

#[tokio::test]
async fn test_health_report() {
    let router = Router::new().route(
        "/health",
        get(|| async {
            Json(json!({
                "status": "healthy",
                "timestamp": "2026-08-07T12:00:00",
                "system_available": true,
            }))
        }),
    );
    let service = service_at(serve(router).await);

    let health = service.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert!(health.system_available);
}

#[tokio::test]
async fn test_health_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = service_at(addr);
    assert!(matches!(
        service.health().await.unwrap_err(),
        SubmitError::Transport(_)
    ));
}

#[test]
fn test_method_round_trips_through_str() {
    assert_eq!(Method::from_str("wav2vec2").unwrap(), Method::Wav2vec2);
    assert_eq!(Method::from_str("google").unwrap(), Method::Google);
    assert!(Method::from_str("whisper").is_err());
    assert_eq!(Method::Google.as_str(), "google");
    assert_eq!(Method::default(), Method::Wav2vec2);
}

#[test]
fn test_base_url_trailing_slash_trimmed() {
    let service =
        TranscriptionService::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
    assert_eq!(service.base_url, "http://localhost:5000");
}
