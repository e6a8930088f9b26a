//! Session orchestration: one dictation session from activation to close.
//!
//! # Architecture
//!
//! ```text
//!                 ┌────────────── pump task ──────────────┐
//! CaptureDevice ──▶ chunk channel ──▶ SegmentDetector ──▶ segment channel
//!                 └───────────────────────────────────────┘      │
//!                                                                ▼
//!                 ┌──────────── dispatch task ────────────────────────────┐
//!                 │ spawn_blocking(transcribe) ─▶ correct ─▶ sink.insert  │
//!                 └───────────────────────────────────────────────────────┘
//! ```
//!
//! One session owns two tasks.  The **pump** feeds captured chunks through
//! the segment detector and forwards closed segments.  The **dispatch** task
//! transcribes segments strictly one at a time, so delivery order always
//! matches speech order even when transcription times vary.
//!
//! # Shutdown ordering
//!
//! Deactivation must never lose tail audio, so it is sequenced: signal the
//! pump to drain, wait for it (it consumes every chunk already delivered,
//! flushes the detector, then stops capture), then wait for dispatch to
//! finish the remaining segments.  One grace deadline covers the whole
//! sequence: the pump itself can be blocked sending into a full segment
//! queue behind a stalled transcription, so both joins run under the same
//! timer.  On expiry dispatch is aborted (unblocking the pump) and its
//! pending results are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::audio::{AudioChunk, CaptureDevice, LevelMeter, SegmentDetector, SpeechSegment};
use crate::config::{SessionConfig, VadConfig};
use crate::stt::{SttError, TranscriptionEngine};
use crate::text::{DeliverySink, TextCorrector};

use super::state::{OrchestratorStatus, SessionState, SharedStatus};

// Segment backlog before the pump applies backpressure to itself.
const SEGMENT_QUEUE_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Tasks and channels of one live session.
struct SessionHandle {
    drain_tx: Option<oneshot::Sender<()>>,
    /// Returns the capture device so the orchestrator can reuse it.
    pump: JoinHandle<Box<dyn CaptureDevice>>,
    dispatch: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// SessionOrchestrator
// ---------------------------------------------------------------------------

/// Owns the capture device and runs at most one session at a time.
///
/// [`set_active`] is the single entry point; the caller (the hotkey loop)
/// invokes it serially, so no internal locking is needed around session
/// state.
///
/// [`set_active`]: SessionOrchestrator::set_active
pub struct SessionOrchestrator {
    vad: VadConfig,
    cfg: SessionConfig,
    engine: Arc<dyn TranscriptionEngine>,
    corrector: Arc<dyn TextCorrector>,
    sink: Arc<dyn DeliverySink>,
    /// `None` while a session borrows the device.
    capture: Option<Box<dyn CaptureDevice>>,
    meter: LevelMeter,
    status: SharedStatus,
    session: Option<SessionHandle>,
}

fn lock_status(status: &SharedStatus) -> MutexGuard<'_, OrchestratorStatus> {
    // A panicked status reader cannot corrupt our writes; take the data.
    status.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionOrchestrator {
    pub fn new(
        vad: VadConfig,
        cfg: SessionConfig,
        engine: Arc<dyn TranscriptionEngine>,
        corrector: Arc<dyn TextCorrector>,
        sink: Arc<dyn DeliverySink>,
        capture: Box<dyn CaptureDevice>,
        status: SharedStatus,
    ) -> Self {
        Self {
            vad,
            cfg,
            engine,
            corrector,
            sink,
            capture: Some(capture),
            meter: LevelMeter::new(),
            status,
            session: None,
        }
    }

    /// Live input level indicator, safe to poll from any thread.
    pub fn meter(&self) -> LevelMeter {
        self.meter.clone()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Drive the session towards the requested state.  Idempotent in both
    /// directions: activating an active orchestrator (or deactivating an
    /// idle one) is a no-op.
    pub async fn set_active(&mut self, active: bool) {
        if active {
            self.activate();
        } else {
            self.deactivate().await;
        }
    }

    // ---- activation --------------------------------------------------------

    fn activate(&mut self) {
        if self.session.is_some() {
            debug!("session: already active, ignoring activate");
            return;
        }
        if !self.engine.is_ready() {
            warn!("session: activation rejected, model not ready");
            lock_status(&self.status).last_error = Some(SttError::ModelNotReady.to_string());
            return;
        }
        let Some(mut capture) = self.capture.take() else {
            // Unreachable while set_active is called serially.
            warn!("session: capture device unavailable");
            return;
        };

        lock_status(&self.status).session = Some(SessionState::Created);

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        if let Err(e) = capture.start(chunk_tx) {
            warn!("session: capture start failed: {e}");
            let mut st = lock_status(&self.status);
            st.last_error = Some(e.to_string());
            st.session = None;
            drop(st);
            self.capture = Some(capture);
            return;
        }

        let (seg_tx, seg_rx) = mpsc::channel(SEGMENT_QUEUE_DEPTH);
        let (drain_tx, drain_rx) = oneshot::channel();

        let pump = tokio::spawn(pump_loop(
            capture,
            chunk_rx,
            seg_tx,
            drain_rx,
            SegmentDetector::new(self.vad.clone()),
            self.meter.clone(),
        ));
        let dispatch = tokio::spawn(dispatch_loop(
            seg_rx,
            Arc::clone(&self.engine),
            Arc::clone(&self.corrector),
            Arc::clone(&self.sink),
            Arc::clone(&self.status),
            self.cfg.history_cap,
        ));

        self.session = Some(SessionHandle { drain_tx: Some(drain_tx), pump, dispatch });
        lock_status(&self.status).session = Some(SessionState::Running);
        info!("session: activated");
    }

    // ---- deactivation ------------------------------------------------------

    async fn deactivate(&mut self) {
        let Some(mut session) = self.session.take() else {
            debug!("session: not active, ignoring deactivate");
            return;
        };

        lock_status(&self.status).session = Some(SessionState::Draining);
        info!("session: draining");

        if let Some(drain_tx) = session.drain_tx.take() {
            let _ = drain_tx.send(());
        }

        // One deadline bounds the whole drain, pump join included.  The pump
        // can itself be blocked sending into a full segment queue behind a
        // wedged transcription, so waiting for it without a deadline would
        // let a stalled inference call hold shutdown hostage.
        let grace = std::time::Duration::from_millis(self.cfg.grace_period_ms);
        let deadline = tokio::time::Instant::now() + grace;
        let mut timed_out = false;

        // Pump first: it flushes the detector and drops the segment sender,
        // which is what lets dispatch run to completion.
        match tokio::time::timeout_at(deadline, &mut session.pump).await {
            Ok(join) => self.reclaim_capture(join),
            Err(_) => {
                // Aborting dispatch drops the segment receiver, which
                // resolves the pump's blocked send and lets it finish its
                // drain (flush, stop) promptly.
                timed_out = true;
                session.dispatch.abort();
                match tokio::time::timeout(grace, &mut session.pump).await {
                    Ok(join) => self.reclaim_capture(join),
                    Err(_) => {
                        session.pump.abort();
                        warn!("session: pump did not drain, dropping capture device");
                    }
                }
            }
        }

        if !timed_out {
            match tokio::time::timeout_at(deadline, &mut session.dispatch).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("session: dispatch task failed: {e}"),
                Err(_) => {
                    // Abort drops pending deliveries.  A transcription
                    // already inside spawn_blocking keeps its thread until
                    // it returns, but its result is discarded.
                    session.dispatch.abort();
                    timed_out = true;
                }
            }
        }

        if timed_out {
            warn!(
                "session: shutdown grace period of {}ms elapsed, dropping pending work",
                self.cfg.grace_period_ms
            );
            lock_status(&self.status).last_error =
                Some(format!("shutdown timed out after {}ms", self.cfg.grace_period_ms));
        }

        lock_status(&self.status).session = Some(SessionState::Closed);
        info!("session: closed");
    }

    fn reclaim_capture(
        &mut self,
        join: Result<Box<dyn CaptureDevice>, tokio::task::JoinError>,
    ) {
        match join {
            Ok(capture) => self.capture = Some(capture),
            Err(e) => warn!("session: pump task failed: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pump task
// ---------------------------------------------------------------------------

/// Feed chunks through the detector until drained or the device dies.
///
/// Drain ordering is load-bearing: chunks already delivered are consumed
/// *before* the detector flush, so the final segment contains every sample
/// captured up to deactivation.  Capture stops last.
async fn pump_loop(
    mut capture: Box<dyn CaptureDevice>,
    mut chunk_rx: mpsc::UnboundedReceiver<AudioChunk>,
    seg_tx: mpsc::Sender<SpeechSegment>,
    mut drain_rx: oneshot::Receiver<()>,
    mut detector: SegmentDetector,
    meter: LevelMeter,
) -> Box<dyn CaptureDevice> {
    loop {
        tokio::select! {
            _ = &mut drain_rx => {
                while let Ok(chunk) = chunk_rx.try_recv() {
                    meter.store(chunk.rms);
                    if let Some(segment) = detector.push(chunk) {
                        let _ = seg_tx.send(segment).await;
                    }
                }
                if let Some(segment) = detector.flush() {
                    debug!("session: flushed {:.0}ms tail segment", segment.duration_ms());
                    let _ = seg_tx.send(segment).await;
                }
                capture.stop();
                break;
            }
            chunk = chunk_rx.recv() => {
                match chunk {
                    Some(chunk) => {
                        meter.store(chunk.rms);
                        if let Some(segment) = detector.push(chunk) {
                            let _ = seg_tx.send(segment).await;
                        }
                    }
                    None => {
                        // Device-side failure; salvage what is buffered.
                        warn!("session: capture channel closed unexpectedly");
                        if let Some(segment) = detector.flush() {
                            let _ = seg_tx.send(segment).await;
                        }
                        capture.stop();
                        break;
                    }
                }
            }
        }
    }
    meter.store(0.0);
    capture
}

// ---------------------------------------------------------------------------
// Dispatch task
// ---------------------------------------------------------------------------

/// Transcribe segments serially and deliver the corrected text.
///
/// A failed transcription is recorded and skipped; the loop keeps serving
/// later segments, so one bad segment never ends the session.
async fn dispatch_loop(
    mut seg_rx: mpsc::Receiver<SpeechSegment>,
    engine: Arc<dyn TranscriptionEngine>,
    corrector: Arc<dyn TextCorrector>,
    sink: Arc<dyn DeliverySink>,
    status: SharedStatus,
    history_cap: usize,
) {
    while let Some(segment) = seg_rx.recv().await {
        let task_engine = Arc::clone(&engine);
        let result =
            tokio::task::spawn_blocking(move || task_engine.transcribe(&segment)).await;

        match result {
            Ok(Ok(transcript)) => {
                if transcript.text.trim().is_empty() {
                    debug!("session: empty transcript, nothing to deliver");
                    continue;
                }
                let corrected = corrector.correct(&transcript.text);
                sink.insert(&corrected);
                lock_status(&status).push_transcript(corrected, history_cap);
            }
            Ok(Err(e)) => {
                warn!("session: transcription failed: {e}");
                lock_status(&status).last_error = Some(e.to_string());
            }
            Err(e) => {
                warn!("session: transcription task panicked: {e}");
                lock_status(&status).last_error = Some(e.to_string());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::audio::CaptureError;
    use crate::session::state::new_shared_status;
    use crate::text::NoopCorrector;

    // ---- test doubles ------------------------------------------------------

    /// Capture device that delivers a fixed script of chunks on start.
    struct ScriptedCapture {
        chunks: Vec<AudioChunk>,
        tx: Option<mpsc::UnboundedSender<AudioChunk>>,
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicBool>,
        fail_start: bool,
    }

    impl ScriptedCapture {
        fn new(chunks: Vec<AudioChunk>) -> (Self, Arc<AtomicUsize>, Arc<AtomicBool>) {
            let started = Arc::new(AtomicUsize::new(0));
            let stopped = Arc::new(AtomicBool::new(false));
            let capture = Self {
                chunks,
                tx: None,
                started: Arc::clone(&started),
                stopped: Arc::clone(&stopped),
                fail_start: false,
            };
            (capture, started, stopped)
        }

        fn failing() -> (Self, Arc<AtomicUsize>) {
            let (mut capture, started, _) = Self::new(Vec::new());
            capture.fail_start = true;
            (capture, started)
        }
    }

    impl CaptureDevice for ScriptedCapture {
        fn start(&mut self, tx: mpsc::UnboundedSender<AudioChunk>) -> Result<(), CaptureError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(CaptureError::NoDevice);
            }
            for chunk in self.chunks.drain(..) {
                let _ = tx.send(chunk);
            }
            // Keep the sender so the channel stays open until stop.
            self.tx = Some(tx);
            Ok(())
        }

        fn stop(&mut self) {
            self.tx = None;
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    /// Engine that replies from a script, records calls and can sleep.
    struct ScriptedEngine {
        ready: bool,
        responses: Mutex<Vec<Result<String, SttError>>>,
        delays_ms: Mutex<Vec<u64>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedEngine {
        fn new(responses: Vec<Result<String, SttError>>) -> Self {
            Self {
                ready: true,
                responses: Mutex::new(responses),
                delays_ms: Mutex::new(Vec::new()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_delays(self, delays_ms: Vec<u64>) -> Self {
            *self.delays_ms.lock().unwrap() = delays_ms;
            self
        }

        fn not_ready() -> Self {
            let mut engine = Self::new(Vec::new());
            engine.ready = false;
            engine
        }
    }

    impl TranscriptionEngine for ScriptedEngine {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn transcribe(&self, _segment: &SpeechSegment) -> Result<crate::stt::Transcript, SttError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delays_ms.lock().unwrap().get(call).copied().unwrap_or(0);
            if delay > 0 {
                std::thread::sleep(Duration::from_millis(delay));
            }
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(crate::stt::Transcript { text: String::new(), confidence: None });
            }
            responses
                .remove(0)
                .map(|text| crate::stt::Transcript { text, confidence: None })
        }
    }

    /// Sink that records everything inserted.
    #[derive(Default)]
    struct RecordingSink {
        texts: Mutex<Vec<String>>,
    }

    impl DeliverySink for RecordingSink {
        fn insert(&self, text: &str) {
            self.texts.lock().unwrap().push(text.to_string());
        }
    }

    // ---- helpers -----------------------------------------------------------

    /// A 100 ms canonical chunk at the given amplitude.
    fn chunk(amplitude: f32) -> AudioChunk {
        AudioChunk { samples: vec![amplitude; 1_600], rms: amplitude.abs() }
    }

    fn speech_then_silence(speech_chunks: usize, silence_chunks: usize) -> Vec<AudioChunk> {
        let mut out = vec![chunk(0.1); speech_chunks];
        out.extend(std::iter::repeat_with(|| chunk(0.0)).take(silence_chunks));
        out
    }

    struct Fixture {
        orch: SessionOrchestrator,
        status: SharedStatus,
        sink: Arc<RecordingSink>,
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicBool>,
    }

    fn fixture(chunks: Vec<AudioChunk>, engine: ScriptedEngine) -> Fixture {
        fixture_with_cfg(chunks, engine, SessionConfig::default())
    }

    fn fixture_with_cfg(
        chunks: Vec<AudioChunk>,
        engine: ScriptedEngine,
        cfg: SessionConfig,
    ) -> Fixture {
        let (capture, started, stopped) = ScriptedCapture::new(chunks);
        let status = new_shared_status();
        let sink = Arc::new(RecordingSink::default());
        let orch = SessionOrchestrator::new(
            VadConfig::default(),
            cfg,
            Arc::new(engine),
            Arc::new(NoopCorrector),
            Arc::clone(&sink) as Arc<dyn DeliverySink>,
            Box::new(capture),
            Arc::clone(&status),
        );
        Fixture { orch, status, sink, started, stopped }
    }

    // ---- tests -------------------------------------------------------------

    #[tokio::test]
    async fn full_session_delivers_transcript() {
        // 500 ms of speech then 800 ms of silence: the detector closes one
        // segment while the session is still running.
        let mut f = fixture(
            speech_then_silence(5, 8),
            ScriptedEngine::new(vec![Ok("hello world".into())]),
        );

        f.orch.set_active(true).await;
        assert!(f.orch.is_active());
        f.orch.set_active(false).await;

        assert_eq!(*f.sink.texts.lock().unwrap(), vec!["hello world".to_string()]);
        let st = f.status.lock().unwrap();
        assert_eq!(st.session, Some(SessionState::Closed));
        assert_eq!(st.history.back().map(String::as_str), Some("hello world"));
        assert!(f.stopped.load(Ordering::SeqCst));
        assert!(!f.orch.is_active());
    }

    #[tokio::test]
    async fn deactivation_flushes_trailing_speech() {
        // Speech with no trailing silence: only the drain-path flush can
        // produce this segment, and it must arrive before capture stops.
        let mut f = fixture(
            speech_then_silence(5, 0),
            ScriptedEngine::new(vec![Ok("tail words".into())]),
        );

        f.orch.set_active(true).await;
        f.orch.set_active(false).await;

        assert_eq!(*f.sink.texts.lock().unwrap(), vec!["tail words".to_string()]);
        assert!(f.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn not_ready_engine_rejects_activation() {
        let mut f = fixture(speech_then_silence(5, 8), ScriptedEngine::not_ready());

        f.orch.set_active(true).await;

        assert!(!f.orch.is_active());
        assert_eq!(f.started.load(Ordering::SeqCst), 0);
        let st = f.status.lock().unwrap();
        assert!(st.session.is_none());
        assert!(st.last_error.as_deref().is_some_and(|e| e.contains("not ready")));
    }

    #[tokio::test]
    async fn capture_start_failure_keeps_orchestrator_usable() {
        let (capture, started) = ScriptedCapture::failing();
        let status = new_shared_status();
        let sink = Arc::new(RecordingSink::default());
        let mut orch = SessionOrchestrator::new(
            VadConfig::default(),
            SessionConfig::default(),
            Arc::new(ScriptedEngine::new(Vec::new())),
            Arc::new(NoopCorrector),
            sink,
            Box::new(capture),
            Arc::clone(&status),
        );

        orch.set_active(true).await;
        assert!(!orch.is_active());
        {
            let st = status.lock().unwrap();
            assert!(st.session.is_none());
            assert!(st.last_error.is_some());
        }

        // The device was handed back, so a retry reaches it again.
        orch.set_active(true).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transcription_failure_does_not_end_session() {
        // Two segments; the first transcription fails.
        let mut chunks = speech_then_silence(4, 8);
        chunks.extend(speech_then_silence(4, 8));
        let mut f = fixture(
            chunks,
            ScriptedEngine::new(vec![
                Err(SttError::Transcription("decode failed".into())),
                Ok("second utterance".into()),
            ]),
        );

        f.orch.set_active(true).await;
        f.orch.set_active(false).await;

        assert_eq!(*f.sink.texts.lock().unwrap(), vec!["second utterance".to_string()]);
        let st = f.status.lock().unwrap();
        assert_eq!(st.session, Some(SessionState::Closed));
        assert!(st.last_error.as_deref().is_some_and(|e| e.contains("decode failed")));
    }

    #[tokio::test]
    async fn stalled_engine_with_full_segment_queue_cannot_hang_shutdown() {
        // Enough closed segments to fill the bounded segment queue while the
        // first transcription sleeps: the pump ends up blocked on a segment
        // send, so deactivation must unwedge it under the grace deadline
        // instead of waiting for the inference call to return.
        let mut chunks = Vec::new();
        for _ in 0..12 {
            chunks.extend(speech_then_silence(3, 8));
        }
        let engine = ScriptedEngine::new(vec![Ok("stalled".into())]).with_delays(vec![1_500]);
        let cfg = SessionConfig { grace_period_ms: 50, history_cap: 20 };
        let mut f = fixture_with_cfg(chunks, engine, cfg);

        f.orch.set_active(true).await;
        let shutdown = tokio::time::timeout(Duration::from_secs(1), f.orch.set_active(false)).await;
        assert!(shutdown.is_ok(), "deactivation must complete under the grace deadline");

        assert!(f.stopped.load(Ordering::SeqCst));
        let st = f.status.lock().unwrap();
        assert_eq!(st.session, Some(SessionState::Closed));
        assert!(st.last_error.as_deref().is_some_and(|e| e.contains("timed out")));
    }

    #[tokio::test]
    async fn flush_precedes_capture_stop_on_drain() {
        // Drive the pump directly with a capacity-1 segment channel that is
        // pre-filled, so the drain-path flush send blocks until this test
        // receives.  While that send is pending, capture must not yet be
        // stopped; a pump that stopped capture before flushing would show
        // the stopped flag here.
        let (mut capture, _, stopped) = ScriptedCapture::new(speech_then_silence(5, 0));
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        capture.start(chunk_tx).unwrap();

        let (seg_tx, mut seg_rx) = mpsc::channel::<SpeechSegment>(1);
        seg_tx.send(SpeechSegment { samples: vec![0.0; 16_000] }).await.unwrap();
        let (drain_tx, drain_rx) = oneshot::channel();

        let pump = tokio::spawn(pump_loop(
            Box::new(capture),
            chunk_rx,
            seg_tx,
            drain_rx,
            SegmentDetector::new(VadConfig::default()),
            LevelMeter::new(),
        ));

        drain_tx.send(()).unwrap();
        // Let the pump reach the blocked flush send.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(
            !stopped.load(Ordering::SeqCst),
            "capture stopped before the detector flush was delivered"
        );

        // Free the channel: the pre-filled entry comes out first, then the
        // flushed tail segment, and only then does the pump stop capture.
        seg_rx.recv().await.unwrap();
        let tail = seg_rx.recv().await.expect("flushed tail segment");
        assert!((tail.duration_ms() - 500.0).abs() < 1.0);

        pump.await.unwrap();
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn grace_timeout_aborts_pending_dispatch() {
        let cfg = SessionConfig { grace_period_ms: 50, history_cap: 20 };
        let engine =
            ScriptedEngine::new(vec![Ok("too late".into())]).with_delays(vec![1_000]);
        let mut f = fixture_with_cfg(speech_then_silence(5, 8), engine, cfg);

        f.orch.set_active(true).await;
        f.orch.set_active(false).await;

        assert!(f.sink.texts.lock().unwrap().is_empty());
        let st = f.status.lock().unwrap();
        assert_eq!(st.session, Some(SessionState::Closed));
        assert!(st.last_error.as_deref().is_some_and(|e| e.contains("timed out")));
    }

    #[tokio::test]
    async fn delivery_order_matches_speech_order() {
        // First segment transcribes slowly, second quickly; serial dispatch
        // must still deliver them in speech order.
        let mut chunks = speech_then_silence(4, 8);
        chunks.extend(speech_then_silence(4, 8));
        let engine = ScriptedEngine::new(vec![Ok("one".into()), Ok("two".into())])
            .with_delays(vec![100, 0]);
        let mut f = fixture(chunks, engine);

        f.orch.set_active(true).await;
        f.orch.set_active(false).await;

        assert_eq!(
            *f.sink.texts.lock().unwrap(),
            vec!["one".to_string(), "two".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_transcript_is_not_delivered() {
        let mut f = fixture(
            speech_then_silence(5, 8),
            ScriptedEngine::new(vec![Ok("   ".into())]),
        );

        f.orch.set_active(true).await;
        f.orch.set_active(false).await;

        assert!(f.sink.texts.lock().unwrap().is_empty());
        assert!(f.status.lock().unwrap().history.is_empty());
    }

    #[tokio::test]
    async fn redundant_transitions_are_no_ops() {
        let mut f = fixture(
            speech_then_silence(5, 8),
            ScriptedEngine::new(vec![Ok("once".into())]),
        );

        // Deactivate before any session exists.
        f.orch.set_active(false).await;
        assert!(f.status.lock().unwrap().session.is_none());

        f.orch.set_active(true).await;
        f.orch.set_active(true).await;
        assert_eq!(f.started.load(Ordering::SeqCst), 1);

        f.orch.set_active(false).await;
        assert_eq!(*f.sink.texts.lock().unwrap(), vec!["once".to_string()]);
    }

    #[tokio::test]
    async fn corrector_runs_before_delivery() {
        let (capture, _, _) = ScriptedCapture::new(speech_then_silence(5, 8));
        let status = new_shared_status();
        let sink = Arc::new(RecordingSink::default());
        let corrector = crate::text::VocabCorrector::new(vec![crate::text::VocabEntry {
            spoken: "get hub".into(),
            replacement: "GitHub".into(),
        }]);
        let mut orch = SessionOrchestrator::new(
            VadConfig::default(),
            SessionConfig::default(),
            Arc::new(ScriptedEngine::new(vec![Ok("push to get hub".into())])),
            Arc::new(corrector),
            Arc::clone(&sink) as Arc<dyn DeliverySink>,
            Box::new(capture),
            Arc::clone(&status),
        );

        orch.set_active(true).await;
        orch.set_active(false).await;

        assert_eq!(*sink.texts.lock().unwrap(), vec!["push to GitHub".to_string()]);
        assert_eq!(
            status.lock().unwrap().history.back().map(String::as_str),
            Some("push to GitHub")
        );
    }
}
