//! Mapping hotkey edges onto session activation commands.

use log::debug;

use crate::config::ActivationMode;

use super::HotkeyEdge;

/// Command for the session orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Activate,
    Deactivate,
}

/// Translates clean hotkey edges into session commands according to the
/// configured [`ActivationMode`].
///
/// Push-to-talk maps `Down` to activate and `Up` to deactivate; toggle
/// flips on every `Down` and ignores `Up`.  Edges that would not change
/// the active state produce no command, so callers can feed every edge
/// without tracking activation themselves.
#[derive(Debug)]
pub struct ActivationStateMachine {
    mode: ActivationMode,
    active: bool,
}

impl ActivationStateMachine {
    pub fn new(mode: ActivationMode) -> Self {
        Self { mode, active: false }
    }

    pub fn mode(&self) -> ActivationMode {
        self.mode
    }

    /// Switch modes.  Only subsequent edges observe the new mode; the
    /// current activation state is preserved.
    pub fn set_mode(&mut self, mode: ActivationMode) {
        debug!("activation: mode set to {mode:?}");
        self.mode = mode;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Apply one edge; returns the command to issue, if any.
    pub fn on_edge(&mut self, edge: HotkeyEdge) -> Option<SessionCommand> {
        let want_active = match (self.mode, edge) {
            (ActivationMode::PushToTalk, HotkeyEdge::Down) => true,
            (ActivationMode::PushToTalk, HotkeyEdge::Up) => false,
            (ActivationMode::Toggle, HotkeyEdge::Down) => !self.active,
            (ActivationMode::Toggle, HotkeyEdge::Up) => return None,
        };
        if want_active == self.active {
            return None;
        }
        self.active = want_active;
        Some(if want_active { SessionCommand::Activate } else { SessionCommand::Deactivate })
    }
}
