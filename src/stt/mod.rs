//! Speech-to-text subsystem.
//!
//! [`TranscriptionEngine`] is the seam the session layer dispatches
//! through; [`WhisperEngine`] is the whisper.cpp-backed implementation and
//! [`BackgroundLoader`] wraps it so model loading never blocks startup.

pub mod engine;
pub mod loader;

pub use engine::{optimal_threads, SttError, Transcript, TranscriptionEngine, WhisperEngine};
pub use loader::BackgroundLoader;

#[cfg(test)]
pub use engine::MockEngine;
