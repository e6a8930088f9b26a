//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//!
//! The settings file is the read side of the configuration surface: an
//! external settings UI writes it, the dictation core only reads it.  Values
//! that can change at runtime (hotkey definition, vocabulary) are replaced
//! wholesale, never mutated in place.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ActivationMode
// ---------------------------------------------------------------------------

/// How hotkey edges map to session activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationMode {
    /// The session is active exactly as long as the hotkey is held down.
    PushToTalk,
    /// One press starts the session, a later press ends it.  Release events
    /// are ignored entirely.
    Toggle,
}

impl Default for ActivationMode {
    fn default() -> Self {
        Self::PushToTalk
    }
}

// ---------------------------------------------------------------------------
// VadConfig
// ---------------------------------------------------------------------------

/// Settings for energy-based voice activity detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    /// RMS amplitude above which a chunk is classified as speech.
    /// Typical values: 0.002 (sensitive) to 0.01 (noisy room).
    pub energy_threshold: f32,
    /// Minimum utterance duration in milliseconds.  Buffered audio shorter
    /// than this is discarded rather than yielded as a segment.
    pub min_speech_ms: u32,
    /// Sustained silence in milliseconds required to close a segment.
    /// Brief pauses shorter than this stay inside the utterance.
    pub min_silence_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.005,
            min_speech_ms: 250,
            min_silence_ms: 700,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Settings for the session orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum milliseconds to wait for an in-flight transcription to finish
    /// after deactivation before it is cancelled and its result dropped.
    pub grace_period_ms: u64,
    /// Maximum number of recent transcripts kept for observability; the
    /// oldest entry is evicted beyond this cap.
    pub history_cap: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 3_000,
            history_cap: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey binding and activation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Hotkey binding string parsed by [`crate::hotkey::parse_hotkey`]
    /// (e.g. `"Ctrl+Space"`, `"Alt"`, `"Globe"`).
    pub binding: String,
    /// Push-to-talk or toggle activation.
    pub mode: ActivationMode,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            binding: "Ctrl+Space".into(),
            mode: ActivationMode::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper transcription engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// GGML model file stem (e.g. `"ggml-base.en"`), resolved against the
    /// models directory from [`AppPaths`].
    pub model: String,
    /// Primary speech language as an ISO-639-1 code, or `"auto"` for
    /// Whisper's built-in language detection.
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "ggml-base.en".into(),
            language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use dictate::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global hotkey binding and activation mode.
    pub hotkey: HotkeyConfig,
    /// Voice activity detection thresholds.
    pub vad: VadConfig,
    /// Session orchestration settings.
    pub session: SessionConfig,
    /// Transcription engine settings.
    pub stt: SttConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
