//! Delivering corrected text into the focused application.
//!
//! Raw key-event typing mishandles anything beyond ASCII, so delivery goes
//! through the clipboard:
//!
//! 1. **Save** the original clipboard content.
//! 2. **Set** the corrected text into the clipboard.
//! 3. **Simulate** Ctrl+V (or ⌘V on macOS) to paste into the focused window.
//! 4. **Restore** the original clipboard content (best-effort).
//!
//! Delivery is fire-and-forget from the session's point of view: a failed
//! paste is logged and dropped, it never fails the session.

use arboard::Clipboard;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use log::{debug, warn};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DeliverError
// ---------------------------------------------------------------------------

/// All errors that can surface during text delivery.
#[derive(Debug, Error)]
pub enum DeliverError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not simulate a key press/release event.
    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),
}

// ---------------------------------------------------------------------------
// DeliverySink trait
// ---------------------------------------------------------------------------

/// Destination for corrected transcripts.
///
/// `insert` is infallible by contract: implementations handle their own
/// failures (log and drop) so the session layer never blocks on delivery
/// problems.
pub trait DeliverySink: Send + Sync {
    fn insert(&self, text: &str);
}

// Compile-time assertion: Box<dyn DeliverySink> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn DeliverySink>) {}
};

// ---------------------------------------------------------------------------
// ClipboardSink
// ---------------------------------------------------------------------------

/// Production sink: clipboard set + simulated paste + restore.
///
/// Short-lived `arboard::Clipboard` and `Enigo` handles are created per
/// call because neither type is `Send` on all platforms and both are cheap
/// to construct.
#[derive(Debug, Clone)]
pub struct ClipboardSink {
    /// Milliseconds to wait after setting the clipboard before simulating
    /// paste, so the clipboard manager flushes first.
    pub delay_ms: u64,
    /// Milliseconds to wait after simulating paste before restoring the
    /// original clipboard, so the target app finishes reading it.
    pub restore_delay_ms: u64,
}

impl Default for ClipboardSink {
    fn default() -> Self {
        Self { delay_ms: 50, restore_delay_ms: 100 }
    }
}

impl ClipboardSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn deliver(&self, text: &str) -> Result<(), DeliverError> {
        let saved = save_clipboard()?;
        set_clipboard(text)?;
        std::thread::sleep(std::time::Duration::from_millis(self.delay_ms));
        simulate_paste()?;
        std::thread::sleep(std::time::Duration::from_millis(self.restore_delay_ms));
        // Restore is best-effort; the paste already happened.
        if let Some(original) = saved {
            let _ = set_clipboard(&original);
        }
        Ok(())
    }
}

impl DeliverySink for ClipboardSink {
    fn insert(&self, text: &str) {
        match self.deliver(text) {
            Ok(()) => debug!("deliver: pasted {} chars", text.chars().count()),
            Err(e) => warn!("deliver: dropped transcript: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// NullSink
// ---------------------------------------------------------------------------

/// Sink that only logs, for headless or debugging runs.
#[derive(Debug, Default)]
pub struct NullSink;

impl DeliverySink for NullSink {
    fn insert(&self, text: &str) {
        debug!("deliver(null): {text}");
    }
}

// ---------------------------------------------------------------------------
// Clipboard / keyboard helpers
// ---------------------------------------------------------------------------

/// Capture the current clipboard plain-text content.
///
/// Returns `Ok(None)` when the clipboard is empty or contains non-text data
/// (e.g. an image).
fn save_clipboard() -> Result<Option<String>, DeliverError> {
    let mut clipboard = open_clipboard()?;
    // `get_text` returns Err if empty or non-text — treat both as None
    Ok(clipboard.get_text().ok())
}

fn set_clipboard(text: &str) -> Result<(), DeliverError> {
    let mut clipboard = open_clipboard()?;
    clipboard
        .set_text(text)
        .map_err(|e| DeliverError::ClipboardSet(e.to_string()))
}

fn open_clipboard() -> Result<Clipboard, DeliverError> {
    Clipboard::new().map_err(|e| DeliverError::ClipboardAccess(e.to_string()))
}

/// Simulate the system paste shortcut in the currently focused window.
///
/// * **macOS** → Meta (⌘) + V
/// * **Windows / Linux** → Ctrl + V
fn simulate_paste() -> Result<(), DeliverError> {
    let mut enigo =
        Enigo::new(&Settings::default()).map_err(|e| DeliverError::KeySimulation(e.to_string()))?;

    #[cfg(target_os = "macos")]
    let modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let modifier = Key::Control;

    enigo
        .key(modifier, Direction::Press)
        .map_err(|e| DeliverError::KeySimulation(e.to_string()))?;
    enigo
        .key(Key::Unicode('v'), Direction::Click)
        .map_err(|e| DeliverError::KeySimulation(e.to_string()))?;
    enigo
        .key(modifier, Direction::Release)
        .map_err(|e| DeliverError::KeySimulation(e.to_string()))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delays() {
        let sink = ClipboardSink::new();
        assert_eq!(sink.delay_ms, 50);
        assert_eq!(sink.restore_delay_ms, 100);
    }

    #[test]
    fn null_sink_accepts_any_text() {
        // Must not panic or block.
        NullSink.insert("hello");
        NullSink.insert("");
    }

    #[test]
    fn deliver_error_display() {
        let e = DeliverError::ClipboardAccess("denied".into());
        assert!(e.to_string().contains("denied"));
    }
}
