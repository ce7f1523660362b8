//! Transcription service client.
//!
//! Packages a finalized recording or a user-selected audio file into a
//! multipart request, submits it to the backend, and interprets the
//! JSON response defensively: a reply is either a transcription, a
//! server-reported error, or malformed, and each shape is handled
//! explicitly.

use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::Artifact;

/// Maximum accepted upload size, matching the backend's request cap.
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// File extensions the backend accepts for uploads.
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["wav", "mp3", "flac", "ogg", "m4a", "mp4", "wma"];

/// Filename reported for submitted recordings.
const RECORDING_FILENAME: &str = "recording.wav";

/// Transcription strategy selector passed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Wav2vec2,
    Google,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Wav2vec2 => "wav2vec2",
            Method::Google => "google",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wav2vec2" => Ok(Method::Wav2vec2),
            "google" => Ok(Method::Google),
            other => Err(format!(
                "Unknown transcription method '{other}' (expected wav2vec2 or google)"
            )),
        }
    }
}

/// Submission failure taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Rejected locally before any network call was made.
    #[error("{0}")]
    Validation(String),
    /// Network failure, timeout, or a malformed response body.
    #[error("{0}")]
    Transport(String),
    /// The backend reported a failure.
    #[error("{0}")]
    Server(String),
}

/// A successful transcription with the metadata the backend reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    pub duration_secs: Option<f64>,
    pub sample_rate: Option<u32>,
    pub method: Option<String>,
    pub timestamp: Option<String>,
}

/// Backend health report from `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: String,
    pub system_available: bool,
}

/// Raw response shape.
///
/// The backend's `error` field may be absent, a boolean (`false` on
/// success), or a string message; any truthy value marks the response
/// as a failure regardless of HTTP status.
#[derive(Debug, Deserialize)]
struct RawReply {
    transcription: Option<String>,
    #[serde(default)]
    error: serde_json::Value,
    duration: Option<f64>,
    sample_rate: Option<u32>,
    method: Option<String>,
    timestamp: Option<String>,
}

fn error_is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn server_message(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// HTTP client for the transcription backend.
pub struct TranscriptionService {
    client: reqwest::Client,
    base_url: String,
}

impl TranscriptionService {
    /// Create a client for the backend at `base_url`.
    ///
    /// `timeout` bounds every request; a stalled submission surfaces
    /// as a [`SubmitError::Transport`] instead of hanging forever.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmitError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Submit a finalized recording to `POST /record`.
    pub async fn transcribe_artifact(
        &self,
        artifact: &Artifact,
        method: Method,
    ) -> Result<Transcription, SubmitError> {
        let part = Part::bytes(artifact.bytes.clone())
            .file_name(RECORDING_FILENAME)
            .mime_str(artifact.mime)
            .map_err(|e| SubmitError::Transport(format!("Failed to build audio part: {e}")))?;

        let form = Form::new()
            .part("audio", part)
            .text("method", method.as_str());

        let url = format!("{}/record", self.base_url);
        debug!(url = %url, bytes = artifact.bytes.len(), method = %method, "Submitting recording");

        self.submit(self.client.post(&url).multipart(form)).await
    }

    /// Submit a user-selected audio file to `POST /api/transcribe`.
    ///
    /// The file is validated locally first; a validation failure makes
    /// no network call.
    pub async fn transcribe_file(
        &self,
        path: &Path,
        method: Method,
    ) -> Result<Transcription, SubmitError> {
        let filename = validate_upload(path)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SubmitError::Validation(format!("Failed to read {}: {e}", path.display())))?;

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename))
            .text("method", method.as_str());

        let url = format!("{}/api/transcribe", self.base_url);
        debug!(url = %url, file = %path.display(), method = %method, "Submitting file");

        self.submit(self.client.post(&url).multipart(form)).await
    }

    /// Query backend health from `GET /health`.
    pub async fn health(&self) -> Result<Health, SubmitError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(format!("Health check failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SubmitError::Server(format!(
                "Health check failed: HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SubmitError::Transport(format!("Malformed health response: {e}")))
    }

    async fn submit(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Transcription, SubmitError> {
        let response = request
            .send()
            .await
            .map_err(|e| SubmitError::Transport(format!("Request failed: {e}")))?;

        let status = response.status();
        let reply: RawReply = response
            .json()
            .await
            .map_err(|e| SubmitError::Transport(format!("Malformed response body: {e}")))?;

        interpret_reply(status, reply)
    }
}

/// Decide success or failure for a backend reply.
///
/// A truthy error field wins regardless of HTTP status, preferring a
/// string message over the generic fallback. A success needs a
/// transcription string; a reply with neither is malformed.
fn interpret_reply(status: StatusCode, reply: RawReply) -> Result<Transcription, SubmitError> {
    if error_is_truthy(&reply.error) {
        let message = server_message(&reply.error)
            .unwrap_or_else(|| "The transcription service reported an error".to_string());
        return Err(SubmitError::Server(message));
    }

    if !status.is_success() {
        return Err(SubmitError::Server(format!(
            "Transcription failed: HTTP {status}"
        )));
    }

    match reply.transcription {
        Some(text) => Ok(Transcription {
            text,
            duration_secs: reply.duration,
            sample_rate: reply.sample_rate,
            method: reply.method,
            timestamp: reply.timestamp,
        }),
        None => Err(SubmitError::Transport(
            "Response carried neither a transcription nor an error".to_string(),
        )),
    }
}

/// Local checks for the upload path. Failures here never touch the
/// network.
fn validate_upload(path: &Path) -> Result<String, SubmitError> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SubmitError::Validation("No file selected".to_string()))?
        .to_string();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(SubmitError::Validation(
                "Invalid file type. Please choose a supported audio file.".to_string(),
            ));
        }
    }

    let size = std::fs::metadata(path)
        .map_err(|e| SubmitError::Validation(format!("Failed to read {}: {e}", path.display())))?
        .len();

    if size > MAX_UPLOAD_BYTES {
        return Err(SubmitError::Validation(
            "File size exceeds the 16 MB limit.".to_string(),
        ));
    }

    Ok(filename)
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;
