// Central Error Types for the diagnostics engine

use crate::port::{HttpError, ProcessError};
use thiserror::Error;

/// Why a probe failed
///
/// Never fatal to a session: the orchestrator turns it into an ERROR update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("IP info failed: {0}")]
    IpInfo(#[source] HttpError),

    #[error("making HTTP HEAD request: {0}")]
    HttpHead(#[source] HttpError),

    #[error("{tool} ({resolver}) failed: DNS lookup command failed: {source}")]
    DnsLookup {
        tool: String,
        resolver: String,
        #[source]
        source: ProcessError,
    },

    #[error("{tool} command failed: {source}")]
    Command {
        tool: String,
        #[source]
        source: ProcessError,
    },

    #[error("cancelled")]
    Cancelled,
}

impl ProbeError {
    /// Output produced before the failure, reported alongside the error
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            ProbeError::DnsLookup { source, .. } | ProbeError::Command { source, .. } => {
                source.partial_output()
            }
            _ => None,
        }
    }
}

/// Failures of the session task itself (not of individual probes)
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session task panicked: {0}")]
    Panicked(String),

    #[error("Session task aborted")]
    Aborted,
}

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;
