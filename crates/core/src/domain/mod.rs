// Domain Layer - Update protocol and probe identities

pub mod probe;
pub mod summary;
pub mod update;

// Re-exports
pub use probe::ProbeKind;
pub use summary::{SessionSummary, StepOutcome, StepReport};
pub use update::{DiagnosticEvent, DiagnosticUpdate, UpdateType, UPDATE_TOPIC};
