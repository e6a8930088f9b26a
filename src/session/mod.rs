//! Session orchestration layer.
//!
//! [`SessionOrchestrator`] ties the subsystems together: it borrows the
//! capture device for the lifetime of a session, pumps audio through the
//! segment detector, and dispatches closed segments to transcription and
//! delivery.  [`OrchestratorStatus`] is the shared, observable view of
//! what the orchestrator is doing.

pub mod orchestrator;
pub mod state;

pub use orchestrator::SessionOrchestrator;
pub use state::{new_shared_status, OrchestratorStatus, SessionState, SharedStatus};
