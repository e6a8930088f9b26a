//! Application entry point — headless dictation daemon.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Start the background model load.
//! 5. Build the corrector, delivery sink and capture device.
//! 6. Spawn the key listener thread.
//! 7. Run the hotkey → session loop until Ctrl-C.

use std::sync::Arc;

use tokio::sync::mpsc;

use dictate::{
    audio::CpalCapture,
    config::{AppConfig, AppPaths},
    hotkey::{
        parse_hotkey, ActivationStateMachine, HotkeyDefinition, HotkeyMatcher, KeyListener,
        MatchOutcome, SessionCommand,
    },
    session::{new_shared_status, SessionOrchestrator},
    stt::{BackgroundLoader, TranscriptionEngine, WhisperEngine},
    text::{ClipboardSink, VocabCorrector},
};

fn main() {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("dictate starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 workers — pump and dispatch each take one)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Background model load — activation is rejected until it finishes.
    let model_path = AppPaths::new().model_file(&config.stt.model);
    let language = config.stt.language.clone();
    let engine: Arc<dyn TranscriptionEngine> = Arc::new(BackgroundLoader::spawn(move || {
        log::info!("loading whisper model from {}", model_path.display());
        WhisperEngine::load(&model_path, language)
            .map(|e| Box::new(e) as Box<dyn TranscriptionEngine>)
    }));

    // 5. Corrector, sink, capture, shared status
    let corrector = Arc::new(VocabCorrector::load_or_default());
    let sink = Arc::new(ClipboardSink::new());
    let status = new_shared_status();

    let mut orchestrator = SessionOrchestrator::new(
        config.vad.clone(),
        config.session.clone(),
        engine,
        corrector,
        sink,
        Box::new(CpalCapture::new()),
        Arc::clone(&status),
    );

    // 6. Key listener thread
    let (key_tx, mut key_rx) = mpsc::channel(64);
    let _listener = KeyListener::start(key_tx);

    let mut definition = parse_hotkey(&config.hotkey.binding).unwrap_or_else(|| {
        log::warn!(
            "Unrecognised hotkey binding '{}'; falling back to Ctrl+Space",
            config.hotkey.binding
        );
        default_binding()
    });
    log::info!("hotkey bound to '{}'", definition.label);

    let mut matcher = HotkeyMatcher::new();
    let mut activation = ActivationStateMachine::new(config.hotkey.mode);

    // 7. Event loop
    rt.block_on(async {
        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        log::error!("cannot listen for shutdown signal: {e}");
                    }
                    log::info!("shutting down");
                    orchestrator.set_active(false).await;
                    break;
                }
                event = key_rx.recv() => {
                    let Some(event) = event else {
                        log::error!("key listener channel closed");
                        orchestrator.set_active(false).await;
                        break;
                    };
                    match matcher.process(&event, &definition) {
                        MatchOutcome::Edge(edge) => {
                            if let Some(cmd) = activation.on_edge(edge) {
                                orchestrator
                                    .set_active(cmd == SessionCommand::Activate)
                                    .await;
                            }
                        }
                        MatchOutcome::Captured(new_def) => {
                            log::info!("hotkey rebound to '{}'", new_def.label);
                            definition = new_def;
                        }
                        MatchOutcome::Ignored => {}
                    }
                }
            }
        }
    });
}

fn default_binding() -> HotkeyDefinition {
    // The compiled-in default always parses.
    parse_hotkey("Ctrl+Space").expect("default binding must parse")
}
