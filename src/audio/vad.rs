//! Energy-based voice activity detection with hysteresis.
//!
//! [`SegmentDetector`] consumes the canonical 16 kHz chunk stream one chunk
//! at a time, in arrival order, and cuts it into bounded [`SpeechSegment`]s.
//! A chunk is classified as speech when its RMS exceeds the configured
//! energy threshold; a segment ends only after *sustained* silence
//! (`min_silence_ms`), so brief pauses do not chop an utterance in half.
//!
//! ## Algorithm
//!
//! ```text
//! Idle ──speech──▶ InSpeech ──silence──▶ TrailingSilence { silence_ms }
//!                     ▲                       │
//!                     └──────speech───────────┤ (silence accumulator reset)
//!                                             │ silence_ms ≥ min_silence_ms
//!                                             ▼
//!                       yield segment if duration ≥ min_speech_ms,
//!                       otherwise discard; reset to Idle
//! ```
//!
//! Silence chunks that arrive while a segment is open are retained inside
//! the segment (not trimmed); the yielded buffer therefore includes trailing
//! silence up to the threshold.  Segments come out in strict chronological
//! order — at most one segment is being assembled at any moment.

use crate::audio::resample::{AudioChunk, TARGET_RATE};
use crate::config::VadConfig;

// ---------------------------------------------------------------------------
// SpeechSegment
// ---------------------------------------------------------------------------

/// One bounded utterance: 16 kHz mono samples from speech onset through the
/// accounted trailing-silence window.
///
/// Created by [`SegmentDetector`], consumed exactly once by the session
/// orchestrator, then discarded.  Invariant: `duration_ms() >=
/// min_speech_ms` for every yielded segment (shorter buffers are discarded,
/// never yielded — including on flush).
#[derive(Debug, Clone)]
pub struct SpeechSegment {
    /// Mono 16 kHz PCM samples.
    pub samples: Vec<f32>,
}

impl SpeechSegment {
    /// Segment duration in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        self.samples.len() as f32 / TARGET_RATE as f32 * 1_000.0
    }
}

// ---------------------------------------------------------------------------
// DetectorState
// ---------------------------------------------------------------------------

/// Internal hysteresis state.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DetectorState {
    /// No open segment; waiting for a speech chunk.
    Idle,
    /// A segment is open and the last chunk was speech.
    InSpeech,
    /// A segment is open and silence is accumulating towards the threshold.
    TrailingSilence {
        /// Milliseconds of consecutive silence seen so far.
        silence_ms: f32,
    },
}

// ---------------------------------------------------------------------------
// SegmentDetector
// ---------------------------------------------------------------------------

/// Stateful chunk-to-segment cutter.
///
/// Pure state-transition functions over an explicit state value: no OS
/// dependency, no channels, fully unit-testable.  The pipeline drives it via
/// [`push`](Self::push) for every chunk and [`flush`](Self::flush) once when
/// capture stops.
pub struct SegmentDetector {
    config: VadConfig,
    state: DetectorState,
    /// Accumulation buffer for the segment currently being assembled.
    buffer: Vec<f32>,
}

impl SegmentDetector {
    /// Create a detector in the `Idle` state with an empty buffer.
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            state: DetectorState::Idle,
            buffer: Vec::new(),
        }
    }

    /// Feed one chunk; returns a completed segment when the trailing-silence
    /// threshold was just crossed and the buffered audio is long enough.
    ///
    /// Chunks must be fed in arrival order.  An empty chunk has RMS `0.0`
    /// and counts as silence of zero duration.
    pub fn push(&mut self, chunk: AudioChunk) -> Option<SpeechSegment> {
        let is_speech = chunk.rms > self.config.energy_threshold;

        if is_speech {
            if self.state == DetectorState::Idle {
                log::debug!("vad: speech onset (rms {:.4})", chunk.rms);
            }
            // Speech always resets the silence accumulator.
            self.buffer.extend_from_slice(&chunk.samples);
            self.state = DetectorState::InSpeech;
            return None;
        }

        match self.state {
            // Silence while no segment is open: nothing to do.
            DetectorState::Idle => None,

            DetectorState::InSpeech => {
                // Keep the silence inside the segment; start accumulating.
                self.buffer.extend_from_slice(&chunk.samples);
                let silence_ms = chunk.duration_ms();
                self.close_or_wait(silence_ms)
            }

            DetectorState::TrailingSilence { silence_ms } => {
                self.buffer.extend_from_slice(&chunk.samples);
                let silence_ms = silence_ms + chunk.duration_ms();
                self.close_or_wait(silence_ms)
            }
        }
    }

    /// Close the open segment if the buffered audio remains, applying the
    /// same minimum-duration test as the silence path, then reset to `Idle`.
    ///
    /// Called by the pipeline when capture stops so trailing audio that
    /// never met the silence threshold is not lost.
    pub fn flush(&mut self) -> Option<SpeechSegment> {
        self.state = DetectorState::Idle;
        if self.buffer.is_empty() {
            return None;
        }
        self.take_buffer_if_long_enough()
    }

    /// Milliseconds of audio currently buffered (open segment).
    pub fn buffered_ms(&self) -> f32 {
        self.buffer.len() as f32 / TARGET_RATE as f32 * 1_000.0
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn close_or_wait(&mut self, silence_ms: f32) -> Option<SpeechSegment> {
        if silence_ms >= self.config.min_silence_ms as f32 {
            self.state = DetectorState::Idle;
            self.take_buffer_if_long_enough()
        } else {
            self.state = DetectorState::TrailingSilence { silence_ms };
            None
        }
    }

    /// Yield the buffer as a segment when it meets `min_speech_ms`,
    /// otherwise discard it silently (a policy outcome, not an error).
    fn take_buffer_if_long_enough(&mut self) -> Option<SpeechSegment> {
        let duration_ms = self.buffered_ms();
        let samples = std::mem::take(&mut self.buffer);

        if duration_ms >= self.config.min_speech_ms as f32 {
            log::debug!("vad: segment closed ({duration_ms:.0} ms)");
            Some(SpeechSegment { samples })
        } else {
            log::debug!("vad: segment below {} ms, discarded", self.config.min_speech_ms);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::resample::canonicalize;

    fn config() -> VadConfig {
        VadConfig {
            energy_threshold: 0.01,
            min_speech_ms: 250,
            min_silence_ms: 700,
        }
    }

    /// Build a 16 kHz chunk of `ms` milliseconds at constant `level`.
    fn chunk(level: f32, ms: usize) -> AudioChunk {
        let samples = vec![level; ms * 16];
        canonicalize(&samples, 16_000, 1)
    }

    // ---- No false onset ----------------------------------------------------

    #[test]
    fn silence_while_idle_never_opens_a_segment() {
        let mut det = SegmentDetector::new(config());
        for _ in 0..50 {
            assert!(det.push(chunk(0.0, 100)).is_none());
        }
        assert_eq!(det.buffered_ms(), 0.0);
        assert!(det.flush().is_none());
    }

    #[test]
    fn empty_chunk_is_silence() {
        let mut det = SegmentDetector::new(config());
        let empty = canonicalize(&[], 16_000, 1);
        assert!(det.push(empty).is_none());
        assert_eq!(det.buffered_ms(), 0.0);
    }

    // ---- Segment assembly --------------------------------------------------

    #[test]
    fn speech_then_qualifying_silence_yields_exactly_one_segment() {
        let mut det = SegmentDetector::new(config());
        let mut segments = Vec::new();

        // 500 ms of loud chunks, then 800 ms of silence in 100 ms chunks.
        for _ in 0..5 {
            if let Some(s) = det.push(chunk(0.5, 100)) {
                segments.push(s);
            }
        }
        for _ in 0..8 {
            if let Some(s) = det.push(chunk(0.0, 100)) {
                segments.push(s);
            }
        }

        assert_eq!(segments.len(), 1);
        // Speech plus the accounted silence window: 500 + 700 = 1200 ms.
        let dur = segments[0].duration_ms();
        assert!(
            (1_100.0..=1_400.0).contains(&dur),
            "unexpected segment duration: {dur} ms"
        );
        // Detector is back to Idle with an empty buffer.
        assert_eq!(det.buffered_ms(), 0.0);
        assert!(det.flush().is_none());
    }

    #[test]
    fn brief_pause_does_not_split_the_segment() {
        let mut det = SegmentDetector::new(config());

        // speech, 300 ms pause (below 700 ms threshold), more speech
        for _ in 0..3 {
            assert!(det.push(chunk(0.5, 100)).is_none());
        }
        for _ in 0..3 {
            assert!(det.push(chunk(0.0, 100)).is_none());
        }
        for _ in 0..3 {
            assert!(det.push(chunk(0.5, 100)).is_none());
        }
        // Now qualifying silence closes one single segment containing it all.
        let mut seg = None;
        for _ in 0..7 {
            if let Some(s) = det.push(chunk(0.0, 100)) {
                seg = Some(s);
            }
        }
        let seg = seg.expect("segment should close after sustained silence");
        // 900 ms of speech+pause plus 700 ms trailing silence.
        assert!((seg.duration_ms() - 1_600.0).abs() < 50.0);
    }

    #[test]
    fn short_speech_run_is_discarded() {
        let mut det = SegmentDetector::new(config());

        // 100 ms of speech (< 250 ms minimum) then qualifying silence.
        assert!(det.push(chunk(0.5, 100)).is_none());
        for _ in 0..8 {
            assert!(det.push(chunk(0.0, 100)).is_none(), "short run must be discarded");
        }
        assert_eq!(det.buffered_ms(), 0.0);
    }

    #[test]
    fn segments_are_yielded_in_chronological_order() {
        let mut det = SegmentDetector::new(config());
        let mut segments = Vec::new();

        for burst in [3, 5] {
            for _ in 0..burst {
                if let Some(s) = det.push(chunk(0.5, 100)) {
                    segments.push(s);
                }
            }
            for _ in 0..8 {
                if let Some(s) = det.push(chunk(0.0, 100)) {
                    segments.push(s);
                }
            }
        }

        assert_eq!(segments.len(), 2);
        // First burst was 300 ms of speech, second 500 ms.
        assert!(segments[0].duration_ms() < segments[1].duration_ms());
    }

    // ---- Flush -------------------------------------------------------------

    #[test]
    fn flush_empty_buffer_yields_nothing() {
        let mut det = SegmentDetector::new(config());
        assert!(det.flush().is_none());
    }

    #[test]
    fn flush_long_buffer_yields_one_segment_and_resets() {
        let mut det = SegmentDetector::new(config());
        for _ in 0..4 {
            assert!(det.push(chunk(0.5, 100)).is_none());
        }

        let seg = det.flush().expect("400 ms buffer must be flushed");
        assert!((seg.duration_ms() - 400.0).abs() < 1.0);
        assert_eq!(det.buffered_ms(), 0.0);
        assert!(det.flush().is_none());
    }

    #[test]
    fn flush_short_buffer_discards() {
        let mut det = SegmentDetector::new(config());
        assert!(det.push(chunk(0.5, 100)).is_none());

        assert!(det.flush().is_none(), "100 ms < min_speech_ms must discard");
        assert_eq!(det.buffered_ms(), 0.0);
    }

    #[test]
    fn flush_during_trailing_silence_keeps_the_silence() {
        let mut det = SegmentDetector::new(config());
        for _ in 0..3 {
            det.push(chunk(0.5, 100));
        }
        for _ in 0..4 {
            det.push(chunk(0.0, 100)); // 400 ms, below the 700 ms threshold
        }

        let seg = det.flush().expect("open segment must be flushed");
        assert!((seg.duration_ms() - 700.0).abs() < 1.0);
    }

    // ---- End-to-end scenario from the design -------------------------------

    #[test]
    fn end_to_end_single_utterance() {
        // threshold 0.01, min speech 250 ms, min silence 700 ms:
        // 500 ms @ RMS 0.5 then 800 ms @ RMS 0.0 → exactly one segment,
        // closed the moment accumulated silence crosses 700 ms.
        let mut det = SegmentDetector::new(config());
        let mut yielded = Vec::new();

        for _ in 0..5 {
            if let Some(s) = det.push(chunk(0.5, 100)) {
                yielded.push(s);
            }
        }
        let mut closed_at_silence_chunk = None;
        for i in 0..8 {
            if let Some(s) = det.push(chunk(0.0, 100)) {
                closed_at_silence_chunk = Some(i);
                yielded.push(s);
            }
        }

        assert_eq!(yielded.len(), 1);
        // 7th silence chunk (index 6) crosses the 700 ms threshold.
        assert_eq!(closed_at_silence_chunk, Some(6));
    }
}
