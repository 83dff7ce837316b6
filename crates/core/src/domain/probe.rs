// Probe identities and their user-facing wording

use serde::{Deserialize, Serialize};

/// One diagnostic check in the fixed sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    IpInfo,
    HttpHead,
    DnsSystem,
    DnsAlternateResolver,
    Traceroute,
    Ping,
}

impl ProbeKind {
    /// The session order. Reports are read top to bottom, so this is significant.
    pub const SEQUENCE: [ProbeKind; 6] = [
        ProbeKind::IpInfo,
        ProbeKind::HttpHead,
        ProbeKind::DnsSystem,
        ProbeKind::DnsAlternateResolver,
        ProbeKind::Traceroute,
        ProbeKind::Ping,
    ];

    /// Heading printed between separator rules in the report
    pub fn label(&self) -> &'static str {
        match self {
            ProbeKind::IpInfo => "Client IP Info",
            ProbeKind::HttpHead => "HTTP HEAD request",
            ProbeKind::DnsSystem => "DNS lookup (using system DNS)",
            ProbeKind::DnsAlternateResolver => "DNS lookup (using Cloudflare)",
            ProbeKind::Traceroute => "Traceroute",
            ProbeKind::Ping => "Ping (n=10)",
        }
    }

    pub fn start_message(&self) -> &'static str {
        match self {
            ProbeKind::IpInfo => "Fetching client IP info...",
            ProbeKind::HttpHead => "Making HTTP request...",
            ProbeKind::DnsSystem => "Running DNS lookup (system DNS)...",
            ProbeKind::DnsAlternateResolver => "Running DNS lookup (Cloudflare)...",
            ProbeKind::Traceroute => "Running traceroute (this may take a while)...",
            ProbeKind::Ping => "Running ping test (n=10)...",
        }
    }

    /// Status line attached to each streamed line
    pub fn progress_message(&self) -> &'static str {
        match self {
            ProbeKind::Traceroute => "Traceroute running (this may take a while)...",
            ProbeKind::Ping => "Ping running (this may take a while)...",
            _ => self.start_message(),
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            ProbeKind::IpInfo => "Client IP information retrieved",
            ProbeKind::HttpHead => "HTTP request completed",
            ProbeKind::DnsSystem => "DNS lookup (system) completed",
            ProbeKind::DnsAlternateResolver => "DNS lookup (Cloudflare) completed",
            ProbeKind::Traceroute => "Traceroute completed",
            ProbeKind::Ping => "Ping completed",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            ProbeKind::IpInfo => "IP info failed",
            ProbeKind::HttpHead => "HTTP request failed",
            ProbeKind::DnsSystem => "DNS lookup (system) failed",
            ProbeKind::DnsAlternateResolver => "DNS lookup (Cloudflare) failed",
            ProbeKind::Traceroute => "Traceroute failed",
            ProbeKind::Ping => "Ping test failed",
        }
    }

    /// Short identifier used in logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::IpInfo => "ip_info",
            ProbeKind::HttpHead => "http_head",
            ProbeKind::DnsSystem => "dns_system",
            ProbeKind::DnsAlternateResolver => "dns_alternate_resolver",
            ProbeKind::Traceroute => "traceroute",
            ProbeKind::Ping => "ping",
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
