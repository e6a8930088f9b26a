//! Microphone capture behind the [`CaptureDevice`] trait, with a `cpal`
//! production implementation.
//!
//! [`CaptureDevice::start`] begins streaming canonical [`AudioChunk`]s over
//! an unbounded tokio channel; [`CaptureDevice::stop`] ends the stream, and
//! stream completion is signalled to the consumer by the channel closing.
//! The device can be stopped mid-stream at any time.
//!
//! [`CpalCapture`] services the real-time cpal callback: each hardware frame
//! is downmixed, resampled and RMS-tagged inline (all O(frame size)) and
//! then sent without blocking — the unbounded channel means the callback
//! never waits on the consumer and no audio is dropped.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::resample::{canonicalize, AudioChunk};

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running audio capture.
///
/// All of these are fatal to the session being started: the orchestrator
/// aborts activation and surfaces the error, with no automatic retry.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("unsupported input sample format: {0}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("capture worker exited before reporting readiness")]
    WorkerExited,
}

// ---------------------------------------------------------------------------
// CaptureDevice trait
// ---------------------------------------------------------------------------

/// Narrow interface the session orchestrator uses to run a microphone.
///
/// Implementations must be `Send` so the running device can live inside the
/// pipeline task.  Contract:
///
/// - `start` begins delivering chunks on `tx` and returns only after the
///   stream is actually running (or failed to).
/// - `stop` ends delivery; the chunk channel closes once the last in-flight
///   chunk has been sent, which is how the consumer observes completion.
/// - `stop` on a device that is not running is a no-op.
pub trait CaptureDevice: Send {
    /// Start streaming canonical chunks to `tx`.
    fn start(&mut self, tx: mpsc::UnboundedSender<AudioChunk>) -> Result<(), CaptureError>;

    /// Stop the stream.  Idempotent.
    fn stop(&mut self);
}

// Compile-time assertion: Box<dyn CaptureDevice> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn CaptureDevice>) {}
};

// ---------------------------------------------------------------------------
// CpalCapture
// ---------------------------------------------------------------------------

/// Production capture device backed by `cpal`.
///
/// `cpal::Stream` is not `Send` on every platform, so the stream is owned by
/// a dedicated OS thread for its whole lifetime: `start` spawns the thread,
/// which builds and plays the stream, reports readiness, and then parks
/// until `stop` signals it.  Dropping the stream on that thread also drops
/// the callback's channel sender, closing the chunk stream for the consumer.
pub struct CpalCapture {
    worker: Option<Worker>,
}

struct Worker {
    stop_tx: std::sync::mpsc::Sender<()>,
    thread: std::thread::JoinHandle<()>,
}

impl CpalCapture {
    /// Create an idle capture device.  The default input device is probed
    /// lazily on `start`, so construction never fails.
    pub fn new() -> Self {
        Self { worker: None }
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for CpalCapture {
    fn start(&mut self, tx: mpsc::UnboundedSender<AudioChunk>) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), CaptureError>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let stream = match build_stream(tx) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Park until stop() signals (or the handle is dropped).
                let _ = stop_rx.recv();
                drop(stream);
                log::debug!("audio-capture: stream stopped");
            })
            .expect("failed to spawn audio-capture thread");

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(Worker { stop_tx, thread });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(CaptureError::WorkerExited),
        }
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.thread.join();
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build and play the input stream on the worker thread.
///
/// The cpal callback canonicalises each raw frame (downmix → resample →
/// RMS) and forwards the resulting chunk.  Send errors are ignored so the
/// audio thread never panics when the receiver has gone away.
fn build_stream(tx: mpsc::UnboundedSender<AudioChunk>) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

    let supported = device.default_input_config()?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(CaptureError::UnsupportedFormat(supported.sample_format()));
    }
    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    log::info!("audio-capture: input stream {sample_rate} Hz, {channels} ch");

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let chunk = canonicalize(data, sample_rate, channels);
            let _ = tx.send(chunk);
        },
        |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
        },
        None, // no timeout
    )?;

    stream.play()?;
    Ok(stream)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_is_a_noop() {
        let mut capture = CpalCapture::new();
        capture.stop();
        capture.stop();
    }

    #[test]
    fn cpal_capture_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CpalCapture>();
    }

    #[test]
    fn no_device_error_message() {
        let e = CaptureError::NoDevice;
        assert!(e.to_string().contains("no input device"));
    }
}
