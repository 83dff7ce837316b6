// Railway NetDiag Core - Domain Logic & Ports
// NO infrastructure dependencies: processes and HTTP are reached through ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{ProbeError, Result, SessionError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
