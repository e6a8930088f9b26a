//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + user vocabulary):
//!   Windows: %APPDATA%\dictate\
//!   macOS:   ~/Library/Application Support/dictate/
//!   Linux:   ~/.config/dictate/
//!
//! Data dir (models):
//!   Windows: %LOCALAPPDATA%\dictate\
//!   macOS:   ~/Library/Application Support/dictate/
//!   Linux:   ~/.local/share/dictate/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `vocabulary.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `vocabulary.json`.
    pub vocab_file: PathBuf,
    /// Directory for downloaded GGML model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "dictate";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let vocab_file = config_dir.join("vocabulary.json");
        let models_dir = data_dir.join("models");

        Self {
            config_dir,
            settings_file,
            vocab_file,
            models_dir,
        }
    }

    /// Path to a GGML model file by stem, e.g. `"ggml-base.en"` resolves to
    /// `<models_dir>/ggml-base.en.bin`.
    pub fn model_file(&self, stem: &str) -> PathBuf {
        self.models_dir.join(format!("{stem}.bin"))
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_and_vocabulary_share_the_config_dir() {
        let paths = AppPaths::new();
        assert_eq!(paths.settings_file, paths.config_dir.join("settings.toml"));
        assert_eq!(paths.vocab_file, paths.config_dir.join("vocabulary.json"));
    }

    #[test]
    fn models_live_under_the_data_dir() {
        // Models are bulky downloads, so they go under the local-data root
        // rather than next to the editable config files.
        let paths = AppPaths::new();
        assert!(paths.models_dir.ends_with("dictate/models"));
        assert!(!paths.models_dir.starts_with(&paths.config_dir) || cfg!(target_os = "macos"));
    }

    #[test]
    fn model_file_appends_the_ggml_extension() {
        let paths = AppPaths::new();
        let model = paths.model_file("ggml-base.en");
        assert_eq!(model, paths.models_dir.join("ggml-base.en.bin"));
        assert!(model.to_str().is_some_and(|s| s.ends_with("ggml-base.en.bin")));
    }
}
