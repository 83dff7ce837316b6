// HTTP Prober Port
// reason: async-trait for object-safe async methods

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Metadata of a HEAD response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResponse {
    pub status_code: u16,
    /// Canonical reason phrase, e.g. `OK`
    pub reason: Option<String>,
    /// Protocol version, e.g. `HTTP/1.1`
    pub protocol: String,
    /// One entry per header value, in arrival order
    pub headers: Vec<(String, String)>,
}

/// HTTP errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("creating HTTP request: {0}")]
    Request(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Transport(String),

    #[error("reading response body: {0}")]
    Body(String),
}

/// HTTP Prober trait
///
/// Redirects are never followed and response status codes are never treated as errors.
#[async_trait]
pub trait HttpProber: Send + Sync {
    /// GET `url` and return the body as text
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, HttpError>;

    /// HEAD `url` with the given user agent
    async fn head(
        &self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<HeadResponse, HttpError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock HTTP Prober for testing
    ///
    /// Unscripted URLs fail like an unreachable host.
    #[derive(Default)]
    pub struct MockHttpProber {
        bodies: Mutex<HashMap<String, Result<String, HttpError>>>,
        heads: Mutex<HashMap<String, Result<HeadResponse, HttpError>>>,
        user_agents: Mutex<Vec<String>>,
    }

    impl MockHttpProber {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_body(self, url: &str, body: Result<String, HttpError>) -> Self {
            self.bodies.lock().unwrap().insert(url.to_string(), body);
            self
        }

        pub fn with_head(self, url: &str, head: Result<HeadResponse, HttpError>) -> Self {
            self.heads.lock().unwrap().insert(url.to_string(), head);
            self
        }

        pub fn user_agents(&self) -> Vec<String> {
            self.user_agents.lock().unwrap().clone()
        }

        fn unreachable(url: &str) -> HttpError {
            HttpError::Transport(format!("error sending request for url ({})", url))
        }
    }

    #[async_trait]
    impl HttpProber for MockHttpProber {
        async fn get_text(&self, url: &str, _timeout: Duration) -> Result<String, HttpError> {
            self.bodies
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(Self::unreachable(url)))
        }

        async fn head(
            &self,
            url: &str,
            user_agent: &str,
            _timeout: Duration,
        ) -> Result<HeadResponse, HttpError> {
            self.user_agents
                .lock()
                .unwrap()
                .push(user_agent.to_string());
            self.heads
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(Self::unreachable(url)))
        }
    }
}
