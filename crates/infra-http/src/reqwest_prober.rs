// HTTP prober implementation
// reason: reqwest with rustls, no system TLS dependency
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{redirect, Client, Version};
use std::error::Error as _;
use std::time::Duration;
use tracing::{debug, info};

use netdiag_core::port::{HeadResponse, HttpError, HttpProber};

/// reqwest-backed HTTP prober
///
/// GETs follow redirects like a browser would; HEADs never do, so the
/// response of the endpoint itself is reported.
pub struct ReqwestProber {
    client: Client,
    no_redirect_client: Client,
}

impl ReqwestProber {
    /// Create a new prober
    ///
    /// # Errors
    /// - HttpError::Request if the TLS backend cannot be initialised
    pub fn new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .build()
            .map_err(|e| HttpError::Request(error_chain(&e)))?;
        let no_redirect_client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| HttpError::Request(error_chain(&e)))?;

        Ok(Self {
            client,
            no_redirect_client,
        })
    }
}

/// Map a reqwest error onto the port's error kinds
fn classify(err: reqwest::Error, timeout: Duration) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(timeout)
    } else if err.is_builder() {
        HttpError::Request(error_chain(&err))
    } else {
        HttpError::Transport(error_chain(&err))
    }
}

/// Protocol as printed in reports: `HTTP/1.1`, `HTTP/2.0`
fn protocol_label(version: Version) -> String {
    format!("{:?}", version)
}

/// `outer: cause: root cause`, since reqwest's own message hides the cause
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl HttpProber for ReqwestProber {
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, HttpError> {
        debug!(url = %url, timeout_ms = timeout.as_millis() as u64, "GET");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        info!(url = %url, status = %response.status(), "GET completed");

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(timeout)
            } else {
                HttpError::Body(error_chain(&e))
            }
        })
    }

    async fn head(
        &self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<HeadResponse, HttpError> {
        debug!(url = %url, timeout_ms = timeout.as_millis() as u64, "HEAD");

        let response = self
            .no_redirect_client
            .head(url)
            .header(USER_AGENT, user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        info!(url = %url, status = %status, "HEAD completed");

        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        Ok(HeadResponse {
            status_code: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            protocol: protocol_label(response.version()),
            headers,
        })
    }
}
