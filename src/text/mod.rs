//! Transcript post-processing and delivery.
//!
//! Two seams: [`TextCorrector`] rewrites a raw transcript (vocabulary
//! substitutions), [`DeliverySink`] puts the result into the focused
//! application (clipboard paste).

pub mod correct;
pub mod deliver;

pub use correct::{NoopCorrector, TextCorrector, VocabCorrector, VocabEntry};
pub use deliver::{ClipboardSink, DeliverError, DeliverySink, NullSink};
