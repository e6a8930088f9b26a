//! Hands-free dictation pipeline: hold a hotkey, speak, and the transcribed
//! text lands in whatever application has focus.
//!
//! # Pipeline
//!
//! ```text
//! microphone (cpal) ──▶ canonicalize: mono 16 kHz f32
//!                              │
//!                              ▼
//!                   energy VAD segmentation
//!                              │ speech segments
//!                              ▼
//!              whisper transcription (serial, off-runtime)
//!                              │ transcripts
//!                              ▼
//!            vocabulary correction ──▶ clipboard paste
//! ```
//!
//! Everything is gated by a global hotkey: the [`hotkey`] module turns OS
//! key events into activation commands, and the [`session`] module runs one
//! dictation session per activation, guaranteeing that no tail audio is
//! lost on release and that transcripts are delivered in speech order.
//!
//! # Module map
//!
//! - [`config`]  — settings file, defaults, platform paths
//! - [`audio`]   — capture, resampling, level metering, VAD
//! - [`hotkey`]  — key listener, matching, activation state machine
//! - [`session`] — orchestration of one dictation session
//! - [`stt`]     — transcription engine trait, whisper backend, background load
//! - [`text`]    — vocabulary correction and clipboard delivery

pub mod audio;
pub mod config;
pub mod hotkey;
pub mod session;
pub mod stt;
pub mod text;
