//! Capture session state machine.
//!
//! A session moves Idle → Recording → Stopped and back to Recording on
//! restart. The state machine is authoritative: starting while a
//! recording is in progress is rejected here, not merely discouraged
//! by disabled controls.

use tokio::sync::broadcast;

/// MIME type asserted for finalized recordings, matching what the
/// backend expects on the wire. The capture path produces raw PCM;
/// see `wav` for the playable framing.
pub const ARTIFACT_MIME: &str = "audio/wav";

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
}

/// Finalized, submittable audio produced by a recording session.
///
/// `bytes` is the concatenation, in arrival order, of every fragment
/// collected between start and stop. `sample_rate` and `channels`
/// describe the PCM layout for playback framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Events emitted on session state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StateChange(SessionState),
}

/// Event sender type.
pub type EventSender = broadcast::Sender<SessionEvent>;

/// One microphone recording session, restartable for the lifetime of
/// the process.
pub struct CaptureSession {
    state: SessionState,
    chunks: Vec<Vec<u8>>,
    artifact: Option<Artifact>,
    event_tx: EventSender,
}

impl CaptureSession {
    /// Create a new session in the Idle state.
    pub fn new(event_tx: EventSender) -> Self {
        Self {
            state: SessionState::Idle,
            chunks: Vec::new(),
            artifact: None,
            event_tx,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The finalized artifact, if a recording has been stopped and not
    /// yet discarded by a restart.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Begin a new recording.
    ///
    /// Discards any previous artifact and fragment sequence. Fails
    /// fast when a recording is already in progress.
    pub fn begin(&mut self) -> Result<(), String> {
        match self.state {
            SessionState::Recording => Err("Recording already in progress".to_string()),
            SessionState::Idle | SessionState::Stopped => {
                self.chunks.clear();
                self.artifact = None;
                self.set_state(SessionState::Recording);
                Ok(())
            }
        }
    }

    /// Append a data fragment in arrival order.
    ///
    /// Fragments are only accepted while Recording.
    pub fn push_chunk(&mut self, chunk: Vec<u8>) -> Result<(), String> {
        if self.state != SessionState::Recording {
            return Err("Session is not recording".to_string());
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Finalize the recording into an artifact.
    ///
    /// Concatenates all fragments collected since `begin` and moves to
    /// Stopped. No-op (returns `None`, no event) unless Recording.
    pub fn finalize(&mut self, sample_rate: u32, channels: u16) -> Option<&Artifact> {
        if self.state != SessionState::Recording {
            return None;
        }

        let bytes = self.chunks.concat();
        self.artifact = Some(Artifact {
            bytes,
            mime: ARTIFACT_MIME,
            sample_rate,
            channels,
        });
        self.set_state(SessionState::Stopped);
        self.artifact.as_ref()
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        // Ignore send errors (no subscribers)
        let _ = self.event_tx.send(SessionEvent::StateChange(state));
    }

    /// Get the event sender for creating subscribers.
    pub fn event_sender(&self) -> EventSender {
        self.event_tx.clone()
    }
}

/// Control affordances derived from the session state.
///
/// Derived deterministically so every state transition updates the
/// record/stop controls and the status line in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub record_enabled: bool,
    pub stop_enabled: bool,
    pub status: &'static str,
}

impl Controls {
    pub fn for_state(state: SessionState) -> Self {
        match state {
            SessionState::Idle => Self {
                record_enabled: true,
                stop_enabled: false,
                status: "Ready to record",
            },
            SessionState::Recording => Self {
                record_enabled: false,
                stop_enabled: true,
                status: "Recording in progress...",
            },
            SessionState::Stopped => Self {
                record_enabled: true,
                stop_enabled: false,
                status: "Recording completed. You can now transcribe or record again.",
            },
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
