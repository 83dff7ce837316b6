// Probe Set - the six diagnostic checks
// Probes only produce text; wording and emission belong to the orchestrator

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};

use super::commands::{self, OsFamily};
use super::constants::{
    ALTERNATE_RESOLVER, ALTERNATE_RESOLVER_NAME, FIRST_OUTPUT_TIMEOUT, HTTP_TIMEOUT, IP_INFO_URL,
    USER_AGENT,
};
use crate::domain::ProbeKind;
use crate::error::{ProbeError, Result};
use crate::port::{
    CommandSpec, HeadResponse, HttpProber, LineStream, ProcessRunner, StderrPolicy, StreamPolicy,
};

/// A streaming probe in flight: the tool name (for error wording) and its lines
pub struct StreamingProbe {
    pub tool: String,
    pub lines: LineStream,
}

/// A started probe, either one-shot or line-streaming
pub enum ProbeRun<'a> {
    Captured(BoxFuture<'a, Result<String>>),
    Streamed(StreamingProbe),
}

/// The fixed set of probes against one target
#[derive(Clone)]
pub struct ProbeSet {
    runner: Arc<dyn ProcessRunner>,
    http: Arc<dyn HttpProber>,
    target: String,
    os_override: Option<OsFamily>,
}

impl ProbeSet {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        http: Arc<dyn HttpProber>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            http,
            target: target.into(),
            os_override: None,
        }
    }

    /// Pin the OS family instead of detecting it (tests exercise both families)
    pub fn with_os_family(mut self, os: OsFamily) -> Self {
        self.os_override = Some(os);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn os(&self) -> OsFamily {
        self.os_override.unwrap_or_else(OsFamily::current)
    }

    /// Start the probe of the given kind
    pub fn start(&self, kind: ProbeKind) -> ProbeRun<'_> {
        match kind {
            ProbeKind::IpInfo => ProbeRun::Captured(self.ip_info().boxed()),
            ProbeKind::HttpHead => ProbeRun::Captured(self.http_head().boxed()),
            ProbeKind::DnsSystem => ProbeRun::Captured(self.dns_system().boxed()),
            ProbeKind::DnsAlternateResolver => ProbeRun::Captured(self.dns_alternate().boxed()),
            ProbeKind::Traceroute => ProbeRun::Streamed(self.traceroute()),
            ProbeKind::Ping => ProbeRun::Streamed(self.ping()),
        }
    }

    /// Fetch client IP information, re-indented when it is JSON
    pub async fn ip_info(&self) -> Result<String> {
        debug!(url = %IP_INFO_URL, "Fetching IP info");
        let body = self
            .http
            .get_text(IP_INFO_URL, HTTP_TIMEOUT)
            .await
            .map_err(ProbeError::IpInfo)?;
        Ok(pretty_json(&body))
    }

    /// HEAD the target without following redirects
    pub async fn http_head(&self) -> Result<String> {
        let url = format!("https://{}", self.target);
        debug!(url = %url, "Sending HEAD request");
        let response = self
            .http
            .head(&url, USER_AGENT, HTTP_TIMEOUT)
            .await
            .map_err(ProbeError::HttpHead)?;
        Ok(format_head_response(&response))
    }

    /// DNS lookup through the system resolver
    pub async fn dns_system(&self) -> Result<String> {
        self.dns_lookup(None, "system DNS").await
    }

    /// DNS lookup through the alternate public resolver
    pub async fn dns_alternate(&self) -> Result<String> {
        self.dns_lookup(Some(ALTERNATE_RESOLVER), ALTERNATE_RESOLVER_NAME)
            .await
    }

    async fn dns_lookup(&self, server: Option<&str>, resolver_name: &str) -> Result<String> {
        let command = commands::dns_lookup(self.os(), server, &self.target);
        info!(command = %command, "Running DNS lookup");

        self.runner
            .run_captured(&command)
            .await
            .map_err(|source| ProbeError::DnsLookup {
                tool: command.program.clone(),
                resolver: resolver_name.to_string(),
                source,
            })
    }

    /// Traceroute; nonzero exits are normal for partially reachable paths
    pub fn traceroute(&self) -> StreamingProbe {
        let policy = StreamPolicy {
            tolerate_nonzero_exit_if_output_produced: true,
            skip_blank_lines: false,
            stderr: StderrPolicy::OnFailure,
            first_output_timeout: Some(FIRST_OUTPUT_TIMEOUT),
        };
        self.stream(commands::traceroute(self.os(), &self.target), policy)
    }

    /// Ping with the fixed echo count; blank lines are dropped
    pub fn ping(&self) -> StreamingProbe {
        let policy = StreamPolicy {
            tolerate_nonzero_exit_if_output_produced: true,
            skip_blank_lines: true,
            stderr: StderrPolicy::Always,
            first_output_timeout: Some(FIRST_OUTPUT_TIMEOUT),
        };
        self.stream(commands::ping(self.os(), &self.target), policy)
    }

    fn stream(&self, command: CommandSpec, policy: StreamPolicy) -> StreamingProbe {
        info!(command = %command, "Starting streaming probe");
        StreamingProbe {
            tool: command.program.clone(),
            lines: self.runner.run_streamed(command, policy),
        }
    }
}

/// Re-indent a JSON document with two spaces, or return it verbatim
pub fn pretty_json(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}

/// `content-type` -> `Content-Type`
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Render a HEAD response; header names are sorted so reports are reproducible
pub fn format_head_response(response: &HeadResponse) -> String {
    let status = match &response.reason {
        Some(reason) => format!("{} {}", response.status_code, reason),
        None => response.status_code.to_string(),
    };

    let mut out = String::new();
    out.push_str(&format!("Status: {}\n", status));
    out.push_str(&format!("Status Code: {}\n", response.status_code));
    out.push_str(&format!("Protocol: {}\n\n", response.protocol));
    out.push_str("Response Headers:\n");

    let mut headers: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (name, value) in &response.headers {
        headers
            .entry(canonical_header_name(name))
            .or_default()
            .push(value);
    }

    for (name, values) in &headers {
        for value in values {
            out.push_str(&format!("  {}: {}\n", name, value));
        }
    }

    out
}
