// Railway NetDiag Infrastructure - System Adapters
// Implements: ProcessRunner

pub mod subprocess_runner;
mod termination;

pub use subprocess_runner::SubprocessRunner;
