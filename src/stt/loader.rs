//! Background model loading.
//!
//! Loading a GGML model takes seconds; doing it on the main path would make
//! the daemon unresponsive at startup.  [`BackgroundLoader`] runs the load
//! on a dedicated thread and itself implements [`TranscriptionEngine`]: it
//! reports not-ready until the load finishes and forwards calls to the
//! loaded engine afterwards.  Activation attempts before that point fail
//! with [`SttError::ModelNotReady`] and no session is created.

use std::sync::{Arc, OnceLock};

use log::{error, info};

use crate::audio::SpeechSegment;

use super::engine::{SttError, Transcript, TranscriptionEngine};

type LoadResult = Result<Box<dyn TranscriptionEngine>, SttError>;

/// Engine proxy that loads its backend on a background thread.
pub struct BackgroundLoader {
    slot: Arc<OnceLock<LoadResult>>,
}

impl BackgroundLoader {
    /// Spawn the loader thread.  `load` runs once on a thread named
    /// `model-loader`; its result is published atomically when done.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn spawn<F>(load: F) -> Self
    where
        F: FnOnce() -> LoadResult + Send + 'static,
    {
        let slot: Arc<OnceLock<LoadResult>> = Arc::new(OnceLock::new());
        let slot_clone = Arc::clone(&slot);

        std::thread::Builder::new()
            .name("model-loader".into())
            .spawn(move || {
                let start = std::time::Instant::now();
                let result = load();
                match &result {
                    Ok(_) => info!(
                        "model-loader: model ready after {:.1}s",
                        start.elapsed().as_secs_f32()
                    ),
                    Err(e) => error!("model-loader: load failed: {e}"),
                }
                let _ = slot_clone.set(result);
            })
            .expect("failed to spawn model-loader thread");

        Self { slot }
    }
}

impl TranscriptionEngine for BackgroundLoader {
    fn is_ready(&self) -> bool {
        matches!(self.slot.get(), Some(Ok(engine)) if engine.is_ready())
    }

    fn transcribe(&self, segment: &SpeechSegment) -> Result<Transcript, SttError> {
        match self.slot.get() {
            Some(Ok(engine)) => engine.transcribe(segment),
            // Load failure is sticky: every later call sees the same error.
            Some(Err(e)) => Err(e.clone()),
            None => Err(SttError::ModelNotReady),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::MockEngine;

    fn segment() -> SpeechSegment {
        SpeechSegment { samples: vec![0.0; 16_000] }
    }

    #[test]
    fn not_ready_until_load_completes() {
        // Gate the load so we can observe the not-ready window.
        let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();

        let loader = BackgroundLoader::spawn(move || {
            gate_rx.recv().ok();
            Ok(Box::new(MockEngine::ok("loaded")) as Box<dyn TranscriptionEngine>)
        });

        assert!(!loader.is_ready());
        assert!(matches!(loader.transcribe(&segment()), Err(SttError::ModelNotReady)));

        gate_tx.send(()).unwrap();
        // Poll for the loader thread to publish.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !loader.is_ready() {
            assert!(std::time::Instant::now() < deadline, "loader never became ready");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(loader.transcribe(&segment()).unwrap().text, "loaded");
    }

    #[test]
    fn load_failure_is_sticky() {
        let loader =
            BackgroundLoader::spawn(|| Err(SttError::ModelNotFound("/missing.bin".into())));

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            match loader.transcribe(&segment()) {
                Err(SttError::ModelNotReady) => {
                    assert!(std::time::Instant::now() < deadline, "load result never published");
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                Err(SttError::ModelNotFound(path)) => {
                    assert_eq!(path, "/missing.bin");
                    break;
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
        // A failed load never reports ready.
        assert!(!loader.is_ready());
    }
}
