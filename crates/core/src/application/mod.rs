// Application Layer - Probe sequencing and update delivery

pub mod channel;
pub mod commands;
pub mod constants;
pub mod orchestrator;
pub mod probes;

// Re-exports
pub use channel::{UpdateChannel, UpdateSubscription};
pub use commands::OsFamily;
pub use orchestrator::{
    format_for_emission, CancelToken, DiagnosticsContext, DiagnosticsOrchestrator, SessionHandle,
};
pub use probes::{ProbeRun, ProbeSet, StreamingProbe};
