//! Core transcription engine trait and the whisper-backed implementation.
//!
//! # Overview
//!
//! [`TranscriptionEngine`] is the interface the session layer dispatches
//! against.  It is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn TranscriptionEngine>` and called from `spawn_blocking`.
//!
//! [`WhisperEngine`] is the production implementation that wraps a
//! `whisper_rs::WhisperContext`.  Construct it with [`WhisperEngine::load`].
//!
//! [`MockEngine`] (available under `#[cfg(test)]`) is a zero-dependency stub
//! that returns a pre-configured response — useful for unit-testing the
//! session layer without a real GGML model file.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::SpeechSegment;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the transcription subsystem.
///
/// `Clone` so a background loader can hand the same load failure to every
/// later caller.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The model is still loading (or its load failed); activation must be
    /// rejected until the engine reports ready.
    #[error("Transcription model is not ready yet")]
    ModelNotReady,

    /// The GGML model file was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// The outcome of transcribing one speech segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Recognised text, whitespace-trimmed.  May be empty when the segment
    /// contained no intelligible speech.
    pub text: String,
    /// Overall confidence in `[0, 1]`, when the backend reports one.
    /// The whisper backend does not, so it always yields `None`.
    pub confidence: Option<f32>,
}

// ---------------------------------------------------------------------------
// TranscriptionEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for transcription engines.
///
/// Implementations must be `Send + Sync` so that they can be held behind an
/// `Arc<dyn TranscriptionEngine>` and called from any thread.
pub trait TranscriptionEngine: Send + Sync {
    /// `true` once the engine can accept [`transcribe`] calls.
    ///
    /// [`transcribe`]: TranscriptionEngine::transcribe
    fn is_ready(&self) -> bool;

    /// Transcribe one speech segment.  Blocking; the session layer calls
    /// this from `spawn_blocking`.
    fn transcribe(&self, segment: &SpeechSegment) -> Result<Transcript, SttError>;
}

// Compile-time assertion: Box<dyn TranscriptionEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TranscriptionEngine>) {}
};

// ---------------------------------------------------------------------------
// Thread count
// ---------------------------------------------------------------------------

/// Inference thread count: available parallelism capped at 8, where whisper
/// throughput flattens out.
pub fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(4) as i32
}

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production engine that wraps a `whisper_rs::WhisperContext`.
///
/// A new `WhisperState` is created for every [`transcribe`] call so the
/// engine can be shared across threads without any locking.
///
/// [`transcribe`]: TranscriptionEngine::transcribe
pub struct WhisperEngine {
    ctx: WhisperContext,
    /// Whisper language hint; `"auto"` lets the model detect it.
    language: String,
    n_threads: i32,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("language", &self.language)
            .field("n_threads", &self.n_threads)
            .finish_non_exhaustive()
    }
}

// `WhisperContext` holds a raw pointer internally but declares
// `unsafe impl Send` and `unsafe impl Sync` in whisper-rs — the model
// weights are read-only after loading.  The remaining fields are fully
// owned and trivially Send+Sync.
// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path` and prepare it for inference.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`] — `model_path` does not exist.
    /// - [`SttError::ContextInit`]  — whisper-rs failed to load the file.
    pub fn load(model_path: impl AsRef<Path>, language: impl Into<String>) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx_params = WhisperContextParameters::default();
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        Ok(Self {
            ctx,
            language: language.into(),
            n_threads: optimal_threads(),
        })
    }
}

impl TranscriptionEngine for WhisperEngine {
    fn is_ready(&self) -> bool {
        true
    }

    fn transcribe(&self, segment: &SpeechSegment) -> Result<Transcript, SttError> {
        let mut fp = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        // set_language takes an Option<&str> whose lifetime is tied to fp.
        // Both `fp` and the borrow of `self.language` remain alive until
        // state.full() returns, so the borrow is valid.
        let lang: Option<&str> = if self.language == "auto" {
            None
        } else {
            Some(self.language.as_str())
        };
        fp.set_language(lang);
        fp.set_n_threads(self.n_threads);
        fp.set_print_progress(false);
        fp.set_print_realtime(false);

        // Per-call state keeps the shared context lock-free.
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        state
            .full(fp, &segment.samples)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let piece = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;
            text.push_str(&piece);
        }

        Ok(Transcript {
            text: text.trim().to_string(),
            confidence: None,
        })
    }
}

// ---------------------------------------------------------------------------
// MockEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response without loading any
/// model file.
#[cfg(test)]
pub struct MockEngine {
    ready: bool,
    response: Result<Transcript, SttError>,
}

#[cfg(test)]
impl MockEngine {
    /// Create a ready mock that always returns `Ok` with `text`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            ready: true,
            response: Ok(Transcript { text: text.into(), confidence: None }),
        }
    }

    /// Create a ready mock that always returns `Err(error)`.
    pub fn err(error: SttError) -> Self {
        Self { ready: true, response: Err(error) }
    }
}

#[cfg(test)]
impl TranscriptionEngine for MockEngine {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn transcribe(&self, _segment: &SpeechSegment) -> Result<Transcript, SttError> {
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
