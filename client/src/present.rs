//! Result presentation and export actions.
//!
//! Renders a transcription result and offers copy, save, and share on
//! the currently displayed text. Clipboard and share access go through
//! capability traits so the actions are testable without a desktop
//! environment.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use tracing::warn;

use crate::notify::Notifier;
use crate::service::Transcription;

const REPORT_HEADER: &str = "Speech-to-Text Transcription Report";
const REPORT_FOOTER: &str = "Generated by voxpost";

/// Writes text to the system clipboard.
pub trait Clipboard {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Clipboard backed by the platform's clipboard command.
pub struct SystemClipboard;

#[cfg(target_os = "macos")]
fn clipboard_command() -> Command {
    Command::new("pbcopy")
}

#[cfg(target_os = "windows")]
fn clipboard_command() -> Command {
    Command::new("clip")
}

#[cfg(all(unix, not(target_os = "macos")))]
fn clipboard_command() -> Command {
    if std::env::var("WAYLAND_DISPLAY").is_ok() {
        Command::new("wl-copy")
    } else {
        let mut command = Command::new("xclip");
        command.args(["-selection", "clipboard"]);
        command
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut child = clipboard_command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Clipboard command unavailable")?;

        child
            .stdin
            .take()
            .context("Clipboard command has no stdin")?
            .write_all(text.as_bytes())
            .context("Failed to write to clipboard command")?;

        let status = child.wait().context("Clipboard command failed")?;
        if !status.success() {
            anyhow::bail!("Clipboard command exited with {status}");
        }

        Ok(())
    }
}

/// Native share integration.
pub trait ShareTarget {
    fn available(&self) -> bool;
    fn share(&self, text: &str) -> Result<()>;
}

/// Share target for platforms without a share sheet. Never available,
/// so sharing falls back to copy.
pub struct NoShare;

impl ShareTarget for NoShare {
    fn available(&self) -> bool {
        false
    }

    fn share(&self, _text: &str) -> Result<()> {
        anyhow::bail!("Sharing is not supported on this platform")
    }
}

/// Serialize a transcription into the downloadable report format.
pub fn build_report(text: &str, generated_at: DateTime<Local>) -> String {
    format!(
        "{REPORT_HEADER}\nGenerated on: {}\n\nTRANSCRIPTION:\n{text}\n\n---\n{REPORT_FOOTER}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Default report filename, date-stamped.
pub fn default_report_filename(date: NaiveDate) -> String {
    format!("transcription_{}.txt", date.format("%Y-%m-%d"))
}

/// Format the result block shown after the workflow output.
pub fn format_result_block(result: &Transcription) -> String {
    let mut block = String::new();
    block.push_str("--- Transcription Result ---\n");
    block.push_str(&result.text);
    block.push('\n');

    let mut meta = Vec::new();
    if let Some(duration) = result.duration_secs {
        meta.push(format!("duration {duration:.2}s"));
    }
    if let Some(method) = &result.method {
        meta.push(method.clone());
    }
    if let Some(timestamp) = &result.timestamp {
        meta.push(timestamp.clone());
    }
    if !meta.is_empty() {
        block.push_str(&format!("({})\n", meta.join(", ")));
    }

    block
}

/// Renders transcription results and drives the export actions.
///
/// Actions always operate on the most recently rendered result, never
/// on stale text.
pub struct Presenter {
    notifier: Arc<dyn Notifier>,
    clipboard: Box<dyn Clipboard>,
    share_target: Box<dyn ShareTarget>,
    current: Option<Transcription>,
}

impl Presenter {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        clipboard: Box<dyn Clipboard>,
        share_target: Box<dyn ShareTarget>,
    ) -> Self {
        Self {
            notifier,
            clipboard,
            share_target,
            current: None,
        }
    }

    /// Presenter wired to the system clipboard with no share target.
    pub fn with_system_targets(notifier: Arc<dyn Notifier>) -> Self {
        Self::new(notifier, Box::new(SystemClipboard), Box::new(NoShare))
    }

    /// Render a result block and make it the target of later actions.
    pub fn render(&mut self, result: Transcription) -> String {
        let block = format_result_block(&result);
        self.current = Some(result);
        block
    }

    /// The currently displayed transcription text, if any.
    pub fn current_text(&self) -> Option<&str> {
        self.current.as_ref().map(|t| t.text.as_str())
    }

    /// Copy the displayed transcription to the clipboard.
    pub fn copy(&self) {
        let Some(text) = self.current_text() else {
            self.notifier.error("No transcription to copy.");
            return;
        };

        match self.clipboard.write_text(text) {
            Ok(()) => self.notifier.success("Text copied to clipboard!"),
            Err(e) => {
                warn!(error = %e, "Clipboard write failed");
                self.notifier.error("Failed to copy text");
            }
        }
    }

    /// Write the report file. Returns the path written on success.
    pub fn save(&self, dest: Option<&Path>) -> Option<PathBuf> {
        let Some(text) = self.current_text() else {
            self.notifier.error("No transcription to save.");
            return None;
        };

        let now = Local::now();
        let path = dest
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(default_report_filename(now.date_naive())));
        let report = build_report(text, now);

        match std::fs::write(&path, report) {
            Ok(()) => {
                self.notifier
                    .success(&format!("Transcription saved to {}", path.display()));
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Report write failed");
                self.notifier.error("Failed to save transcription");
                None
            }
        }
    }

    /// Share the displayed transcription, falling back to copy when no
    /// share target exists or sharing fails.
    pub fn share(&self) {
        let Some(text) = self.current_text() else {
            self.notifier.error("No transcription to share.");
            return;
        };

        if self.share_target.available() {
            match self.share_target.share(text) {
                Ok(()) => {
                    self.notifier.success("Transcription shared!");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Share failed, copying instead");
                }
            }
        }

        self.copy();
    }
}

#[cfg(test)]
#[path = "present_test.rs"]
mod tests;
