// Port Layer - Interfaces for external dependencies

pub mod http_client;
pub mod id_provider; // For deterministic testing
pub mod process_runner;
pub mod time_provider;

// Re-exports
pub use http_client::{HeadResponse, HttpError, HttpProber};
pub use id_provider::IdProvider;
pub use process_runner::{
    CommandSpec, ExitSummary, LineStream, OutputLine, OutputSource, ProcessError, ProcessRunner,
    StderrPolicy, StreamCompletion, StreamPolicy,
};
pub use time_provider::TimeProvider;
