//! Session lifecycle states and observable orchestrator status.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle of one dictation session.
///
/// ```text
/// Created ──▶ Running ──▶ Draining ──▶ Closed
/// ```
///
/// `Created` is transient (capture is being started); `Draining` covers the
/// window between deactivation and the last in-flight transcription
/// finishing or timing out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Running,
    Draining,
    Closed,
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Running => "running",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        }
    }
}

// ---------------------------------------------------------------------------
// OrchestratorStatus
// ---------------------------------------------------------------------------

/// Observable state of the orchestrator, shared behind a mutex so status
/// consumers (UI, logging) never touch orchestrator internals.
#[derive(Debug, Default)]
pub struct OrchestratorStatus {
    /// State of the current session; `None` when idle.
    pub session: Option<SessionState>,
    /// Most recent error, kept until the next one overwrites it.
    pub last_error: Option<String>,
    /// Delivered transcripts, oldest first, bounded by the configured cap.
    pub history: VecDeque<String>,
}

impl OrchestratorStatus {
    /// Append a delivered transcript, evicting the oldest past `cap`.
    pub fn push_transcript(&mut self, text: String, cap: usize) {
        self.history.push_back(text);
        while self.history.len() > cap {
            self.history.pop_front();
        }
    }
}

/// Shared handle to the orchestrator status.
pub type SharedStatus = Arc<Mutex<OrchestratorStatus>>;

pub fn new_shared_status() -> SharedStatus {
    Arc::new(Mutex::new(OrchestratorStatus::default()))
}
