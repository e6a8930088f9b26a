//! Lossy audio-level side channel.
//!
//! [`LevelMeter`] publishes the RMS of the most recent [`AudioChunk`] so a
//! UI observer can render an input level while the pipeline runs.  Updates
//! use overwrite semantics with no backpressure: a reader polling slower
//! than the chunk rate simply misses intermediate values, which is
//! acceptable for metering.
//!
//! [`AudioChunk`]: crate::audio::AudioChunk

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// LevelMeter
// ---------------------------------------------------------------------------

/// Shared single-value level meter.
///
/// Cheap to clone (`Arc` clone); the pipeline writes, any number of
/// observers read.  The `f32` level is stored as its bit pattern in an
/// `AtomicU32` so no lock is involved on either side.
#[derive(Debug, Clone, Default)]
pub struct LevelMeter {
    level: Arc<AtomicU32>,
}

impl LevelMeter {
    /// Create a meter reading `0.0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the current level with `rms`.
    pub fn store(&self, rms: f32) {
        self.level.store(rms.to_bits(), Ordering::Relaxed);
    }

    /// Read the most recently stored level.
    pub fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let meter = LevelMeter::new();
        assert_eq!(meter.level(), 0.0);
    }

    #[test]
    fn store_overwrites_previous_value() {
        let meter = LevelMeter::new();
        meter.store(0.25);
        meter.store(0.5);
        assert_eq!(meter.level(), 0.5);
    }

    #[test]
    fn clones_share_the_same_value() {
        let writer = LevelMeter::new();
        let reader = writer.clone();
        writer.store(0.125);
        assert_eq!(reader.level(), 0.125);
    }

    #[test]
    fn meter_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LevelMeter>();
    }
}
