//! User notification sink.
//!
//! Every user-visible notification in the workflow goes through one
//! injected [`Notifier`], so components can run against a terminal, a
//! toast surface, or a test collector without knowing the difference.

use std::sync::Mutex;
use std::time::Duration;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

/// Auto-dismiss hint for action feedback.
pub const DISMISS_SHORT: Duration = Duration::from_secs(3);

/// Auto-dismiss hint for errors, which stay up longer.
pub const DISMISS_LONG: Duration = Duration::from_secs(5);

/// Sink for transient user notifications.
///
/// `dismiss_after` is a hint for toast-style sinks; sinks without an
/// expiry concept ignore it.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, message: &str, dismiss_after: Duration);

    fn info(&self, message: &str) {
        self.notify(Level::Info, message, DISMISS_SHORT);
    }

    fn success(&self, message: &str) {
        self.notify(Level::Success, message, DISMISS_SHORT);
    }

    fn error(&self, message: &str) {
        self.notify(Level::Error, message, DISMISS_LONG);
    }
}

/// Prints notifications to the terminal.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, level: Level, message: &str, _dismiss_after: Duration) {
        match level {
            Level::Error => eprintln!("error: {message}"),
            Level::Success => println!("ok: {message}"),
            Level::Info => println!("{message}"),
        }
    }
}

/// A notification recorded by [`MemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub level: Level,
    pub message: String,
    pub dismiss_after: Duration,
}

/// Collects notifications in memory for later inspection.
#[derive(Default)]
pub struct MemoryNotifier {
    notes: Mutex<Vec<Note>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications recorded so far, in order.
    pub fn notes(&self) -> Vec<Note> {
        self.notes.lock().expect("notifier lock").clone()
    }

    /// True if any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.notes().iter().any(|n| n.message.contains(needle))
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, level: Level, message: &str, dismiss_after: Duration) {
        self.notes.lock().expect("notifier lock").push(Note {
            level,
            message: message.to_string(),
            dismiss_after,
        });
    }
}

#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;
