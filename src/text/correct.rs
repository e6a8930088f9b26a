//! Transcript post-processing via a user vocabulary.
//!
//! Speech models routinely mangle project names, jargon and acronyms.  The
//! vocabulary is a user-maintained list of `spoken → replacement` pairs
//! applied to every transcript before delivery ("get hub" → "GitHub").
//!
//! Corrections are plain substring replacements applied longest-spoken
//! first, so "pull request review" wins over "pull request" when both are
//! configured.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::AppPaths;

// ---------------------------------------------------------------------------
// TextCorrector trait
// ---------------------------------------------------------------------------

/// Transforms a raw transcript into the text to deliver.
///
/// Infallible: a corrector that cannot improve the text returns it
/// unchanged rather than failing the pipeline.
pub trait TextCorrector: Send + Sync {
    fn correct(&self, text: &str) -> String;
}

// Compile-time assertion: Box<dyn TextCorrector> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TextCorrector>) {}
};

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// One vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabEntry {
    /// What the model tends to produce.
    pub spoken: String,
    /// What the user wants instead.
    pub replacement: String,
}

/// Vocabulary-driven corrector.
///
/// Entries are sorted longest-spoken first at construction so overlapping
/// patterns resolve deterministically; entries with an empty `spoken` are
/// dropped.
#[derive(Debug, Default)]
pub struct VocabCorrector {
    entries: Vec<VocabEntry>,
}

impl VocabCorrector {
    pub fn new(mut entries: Vec<VocabEntry>) -> Self {
        entries.retain(|e| !e.spoken.is_empty());
        entries.sort_by(|a, b| b.spoken.len().cmp(&a.spoken.len()));
        Self { entries }
    }

    /// Load from the default vocabulary file.
    ///
    /// Degrades to an empty vocabulary on any failure — a broken vocab file
    /// must never take dictation down.
    pub fn load_or_default() -> Self {
        Self::load_from(&AppPaths::new().vocab_file)
    }

    /// Load from `path`.  Missing or unparseable files yield an empty
    /// vocabulary with a log line, never an error.
    pub fn load_from(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("vocabulary: no file at {}, starting empty", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str::<Vec<VocabEntry>>(&raw) {
            Ok(entries) => {
                debug!("vocabulary: loaded {} entries from {}", entries.len(), path.display());
                Self::new(entries)
            }
            Err(e) => {
                warn!("vocabulary: cannot parse {} ({e}), starting empty", path.display());
                Self::default()
            }
        }
    }

    /// Persist the entries as pretty-printed JSON.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, raw)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TextCorrector for VocabCorrector {
    fn correct(&self, text: &str) -> String {
        let mut out = text.to_string();
        for entry in &self.entries {
            out = out.replace(&entry.spoken, &entry.replacement);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// NoopCorrector
// ---------------------------------------------------------------------------

/// Identity corrector for configurations with no vocabulary.
#[derive(Debug, Default)]
pub struct NoopCorrector;

impl TextCorrector for NoopCorrector {
    fn correct(&self, text: &str) -> String {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
