//! Recording-and-submission workflow.
//!
//! Coordinates the capture session, the capture device, and the
//! transcription service. Every failure at an async boundary is
//! converted into a single user notification here; nothing propagates
//! to a global handler and the workflow stays usable after any error.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::audio::{CaptureBackend, CaptureStream};
use crate::notify::Notifier;
use crate::service::{Method, SubmitError, Transcription, TranscriptionService};
use crate::session::{CaptureSession, Controls, SessionEvent, SessionState};

/// Default label on the submit control.
pub const SUBMIT_LABEL: &str = "Transcribe Recording";

/// Label shown while a submission is in flight.
pub const SUBMIT_BUSY_LABEL: &str = "Transcribing...";

/// Submit control affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitControl {
    pub enabled: bool,
    pub label: &'static str,
}

/// The recording-and-submission workflow controller.
pub struct Workflow {
    session: CaptureSession,
    backend: Box<dyn CaptureBackend>,
    stream: Option<Box<dyn CaptureStream>>,
    service: TranscriptionService,
    notifier: Arc<dyn Notifier>,
    submitting: bool,
}

impl Workflow {
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        service: TranscriptionService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            session: CaptureSession::new(event_tx),
            backend,
            stream: None,
            service,
            notifier,
            submitting: false,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Record/stop affordances for the current session state.
    pub fn controls(&self) -> Controls {
        Controls::for_state(self.session.state())
    }

    /// Submit control affordance, busy while a request is in flight.
    pub fn submit_control(&self) -> SubmitControl {
        if self.submitting {
            SubmitControl {
                enabled: false,
                label: SUBMIT_BUSY_LABEL,
            }
        } else {
            SubmitControl {
                enabled: true,
                label: SUBMIT_LABEL,
            }
        }
    }

    /// Subscribe to session state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.event_sender().subscribe()
    }

    /// Start a new recording session.
    ///
    /// Fails fast if a recording is already in progress. A device or
    /// permission failure raises a notification and leaves the session
    /// Idle without returning an error; callers observe the outcome
    /// through the session state.
    pub fn start_recording(&mut self) -> Result<(), String> {
        if self.session.state() == SessionState::Recording {
            return Err("Recording already in progress".to_string());
        }

        match self.backend.open() {
            Ok(stream) => {
                info!(
                    sample_rate = stream.sample_rate(),
                    channels = stream.channels(),
                    "Recording started"
                );
                self.session.begin()?;
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Microphone access failed");
                self.notifier
                    .error("Error accessing microphone. Please check permissions.");
                Ok(())
            }
        }
    }

    /// Poll the capture stream and append any new fragments to the
    /// session in arrival order.
    pub fn poll_chunks(&mut self) {
        if self.session.state() != SessionState::Recording {
            return;
        }

        if let Some(stream) = self.stream.as_mut() {
            while let Some(chunk) = stream.try_chunk() {
                if let Err(e) = self.session.push_chunk(chunk) {
                    warn!(error = %e, "Dropped audio fragment");
                    break;
                }
            }
        }
    }

    /// Stop recording. No-op unless a recording is in progress.
    ///
    /// Drains the fragments that arrived since the last poll, tears
    /// the device stream down (exactly once, enforced by ownership),
    /// and finalizes the artifact.
    pub fn stop_recording(&mut self) {
        if self.session.state() != SessionState::Recording {
            return;
        }

        let Some(mut stream) = self.stream.take() else {
            return;
        };

        while let Some(chunk) = stream.try_chunk() {
            if let Err(e) = self.session.push_chunk(chunk) {
                warn!(error = %e, "Dropped audio fragment");
                break;
            }
        }

        let sample_rate = stream.sample_rate();
        let channels = stream.channels();
        stream.close();

        if let Some(artifact) = self.session.finalize(sample_rate, channels) {
            info!(bytes = artifact.bytes.len(), "Recording finalized");
        }
    }

    /// Submit the finalized recording for transcription.
    ///
    /// Returns the transcription on success; on any failure a single
    /// notification is raised and `None` is returned. The submit
    /// control is restored on every completion path.
    pub async fn transcribe_recording(&mut self, method: Method) -> Option<Transcription> {
        let Some(artifact) = self.session.artifact() else {
            self.notifier.error("No recording available to transcribe.");
            return None;
        };
        let artifact = artifact.clone();

        self.submitting = true;
        let result = self.service.transcribe_artifact(&artifact, method).await;
        // Restore the control before looking at the outcome.
        self.submitting = false;

        self.unpack(result)
    }

    /// Submit a user-selected audio file for transcription.
    ///
    /// Validation failures (missing file, wrong type, over the 16 MB
    /// limit) notify locally without any network call.
    pub async fn transcribe_file(&mut self, path: &Path, method: Method) -> Option<Transcription> {
        self.submitting = true;
        let result = self.service.transcribe_file(path, method).await;
        self.submitting = false;

        self.unpack(result)
    }

    fn unpack(&self, result: Result<Transcription, SubmitError>) -> Option<Transcription> {
        match result {
            Ok(transcription) => {
                info!(chars = transcription.text.len(), "Transcription received");
                Some(transcription)
            }
            Err(SubmitError::Validation(message)) | Err(SubmitError::Server(message)) => {
                self.notifier.error(&message);
                None
            }
            Err(SubmitError::Transport(message)) => {
                warn!(error = %message, "Transcription request failed");
                self.notifier
                    .error("Error transcribing audio. Please try again.");
                None
            }
        }
    }

    /// Write the finalized recording as a playable WAV file.
    pub fn save_recording(&self, path: &Path) -> anyhow::Result<()> {
        let artifact = self.session.artifact().context("No finalized recording")?;
        crate::wav::write_wav_file(path, &artifact.bytes, artifact.sample_rate, artifact.channels)
    }
}

#[cfg(test)]
#[path = "workflow_test.rs"]
mod tests;
