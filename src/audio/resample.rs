//! Audio canonicalisation: channel downmix, resampling and RMS.
//!
//! Every raw frame delivered by the capture device is converted into an
//! [`AudioChunk`] — **16 kHz mono `f32`** samples plus the chunk's RMS
//! amplitude.  The conversion is a pure per-frame transform: no state is
//! carried across calls, so identical input always yields identical output.
//! The minor interpolation error at frame boundaries is an accepted
//! approximation.
//!
//! All three steps run inside the real-time capture callback, so each is
//! O(frame size) with a single output allocation.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Canonical sample rate of the pipeline in Hz.
pub const TARGET_RATE: u32 = 16_000;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// One canonicalised buffer of audio: mono, 16 kHz, `f32` in `[-1.0, 1.0]`.
///
/// Produced continuously while capture runs; immutable once emitted.
/// Ownership transfers from the capture stage to the segment detector
/// (single consumer).  The RMS is computed once at creation and doubles as
/// the level-metering side channel.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Mono 16 kHz PCM samples.
    pub samples: Vec<f32>,
    /// RMS amplitude of `samples`; `0.0` for an empty chunk.
    pub rms: f32,
}

impl AudioChunk {
    /// Chunk duration in milliseconds at the canonical 16 kHz rate.
    pub fn duration_ms(&self) -> f32 {
        self.samples.len() as f32 / TARGET_RATE as f32 * 1_000.0
    }
}

// ---------------------------------------------------------------------------
// downmix_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all
/// channels (arithmetic mean — not peak, not first-channel).
///
/// The output length is `samples.len() / channels`.
///
/// * If `channels == 1` the input slice is returned as an owned `Vec` with no
///   averaging (fast path — avoids per-frame arithmetic when already mono).
/// * If `channels == 0` an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use dictate::audio::downmix_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = downmix_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.0).abs() < 1e-6);
/// ```
pub fn downmix_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample_to_16k
// ---------------------------------------------------------------------------

/// Resample `samples` from `source_rate` Hz to 16 000 Hz using linear
/// interpolation.
///
/// For output index `i` the source position is `i * source_rate / 16000`;
/// the sample is a lerp between the two adjacent source samples, and the
/// final source index is clamped to the last valid sample so no
/// out-of-bounds read can occur.
///
/// * If `source_rate` is already `16_000` the input is cloned and returned
///   unchanged (no-op fast path).
/// * If `samples` is empty an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use dictate::audio::resample_to_16k;
///
/// // Downsample from 48 kHz to 16 kHz (ratio = 1/3)
/// let hi = vec![0.5_f32; 480];
/// let lo = resample_to_16k(&hi, 48_000);
/// assert_eq!(lo.len(), 160);
/// ```
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    if source_rate == TARGET_RATE {
        return samples.to_vec();
    }

    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = TARGET_RATE as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac as f32) + samples[idx + 1] * frac as f32
        } else {
            // Clamp to the last valid sample.
            samples[samples.len() - 1]
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// rms
// ---------------------------------------------------------------------------

/// Root-mean-square amplitude of `samples`.
///
/// An empty slice yields `0.0` (and is therefore classified as silence by
/// the segment detector).
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_sq.sqrt()
}

// ---------------------------------------------------------------------------
// canonicalize
// ---------------------------------------------------------------------------

/// Convert one raw frame (interleaved samples at `source_rate` Hz with
/// `channels` channels) into a canonical [`AudioChunk`].
///
/// Deterministic given identical input; no internal buffering across calls.
pub fn canonicalize(samples: &[f32], source_rate: u32, channels: u16) -> AudioChunk {
    let mono = downmix_mono(samples, channels);
    let samples = resample_to_16k(&mono, source_rate);
    let rms = rms(&samples);
    AudioChunk { samples, rms }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
