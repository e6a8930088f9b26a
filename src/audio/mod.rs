//! Audio pipeline — capture → canonicalisation → segment detection.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → canonicalize (downmix + 16 kHz + RMS)
//!           → AudioChunk (channel) → SegmentDetector → SpeechSegment
//!                       └──▶ LevelMeter (lossy side channel)
//! ```
//!
//! The capture callback is the only real-time context; everything it does is
//! O(frame size).  Chunks cross into the detector over a channel with
//! single-consumer ownership, and completed segments flow to the session
//! orchestrator in strict chronological order.

pub mod capture;
pub mod meter;
pub mod resample;
pub mod vad;

pub use capture::{CaptureDevice, CaptureError, CpalCapture};
pub use meter::LevelMeter;
pub use resample::{canonicalize, downmix_mono, resample_to_16k, rms, AudioChunk, TARGET_RATE};
pub use vad::{SegmentDetector, SpeechSegment};
