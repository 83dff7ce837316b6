// Platform-specific command selection for the OS-tool probes

use super::constants::{
    PING_COUNT, TRACERT_WAIT_MS, TRACEROUTE_QUERIES_PER_HOP, TRACEROUTE_WAIT_SECS,
};
use crate::port::CommandSpec;

/// Host operating system family, as far as tool flags are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    /// Linux, macOS and the BSDs
    Unix,
}

impl OsFamily {
    /// Detect the family of the running host
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        if os == "windows" {
            OsFamily::Windows
        } else {
            OsFamily::Unix
        }
    }

    /// Name of the DNS lookup tool on this family
    pub fn dns_tool(&self) -> &'static str {
        match self {
            OsFamily::Windows => "nslookup",
            OsFamily::Unix => "dig",
        }
    }
}

/// DNS lookup of `host`, optionally against an explicit resolver
///
/// nslookup takes the server as a trailing positional argument, dig as an `@server` token.
pub fn dns_lookup(os: OsFamily, server: Option<&str>, host: &str) -> CommandSpec {
    let mut args = Vec::with_capacity(2);
    match (os, server) {
        (OsFamily::Windows, Some(server)) => {
            args.push(host.to_string());
            args.push(server.to_string());
        }
        (OsFamily::Unix, Some(server)) => {
            args.push(format!("@{}", server));
            args.push(host.to_string());
        }
        (_, None) => args.push(host.to_string()),
    }
    CommandSpec::new(os.dns_tool(), args)
}

/// Traceroute to `host`
pub fn traceroute(os: OsFamily, host: &str) -> CommandSpec {
    match os {
        OsFamily::Windows => CommandSpec::new(
            "tracert",
            ["-w".to_string(), TRACERT_WAIT_MS.to_string(), host.to_string()],
        ),
        // -I ICMP, -n no hostname resolution, -q queries per hop, -w wait per probe
        OsFamily::Unix => CommandSpec::new(
            "traceroute",
            [
                "-I".to_string(),
                "-n".to_string(),
                "-q".to_string(),
                TRACEROUTE_QUERIES_PER_HOP.to_string(),
                "-w".to_string(),
                TRACEROUTE_WAIT_SECS.to_string(),
                host.to_string(),
            ],
        ),
    }
}

/// Ping `host` with the fixed echo count
pub fn ping(os: OsFamily, host: &str) -> CommandSpec {
    let count_flag = match os {
        OsFamily::Windows => "-n",
        OsFamily::Unix => "-c",
    };
    CommandSpec::new(
        "ping",
        [count_flag.to_string(), PING_COUNT.to_string(), host.to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_detection() {
        assert_eq!(OsFamily::from_os("windows"), OsFamily::Windows);
        assert_eq!(OsFamily::from_os("linux"), OsFamily::Unix);
        assert_eq!(OsFamily::from_os("macos"), OsFamily::Unix);
    }

    #[test]
    fn test_dns_lookup_argument_shapes() {
        assert_eq!(
            dns_lookup(OsFamily::Unix, Some("1.1.1.1"), "example.com"),
            CommandSpec::new("dig", ["@1.1.1.1", "example.com"])
        );
        assert_eq!(
            dns_lookup(OsFamily::Unix, None, "example.com"),
            CommandSpec::new("dig", ["example.com"])
        );
        assert_eq!(
            dns_lookup(OsFamily::Windows, Some("1.1.1.1"), "example.com"),
            CommandSpec::new("nslookup", ["example.com", "1.1.1.1"])
        );
        assert_eq!(
            dns_lookup(OsFamily::Windows, None, "example.com"),
            CommandSpec::new("nslookup", ["example.com"])
        );
    }

    #[test]
    fn test_traceroute_flags() {
        assert_eq!(
            traceroute(OsFamily::Unix, "example.com").to_string(),
            "traceroute -I -n -q 2 -w 3 example.com"
        );
        assert_eq!(
            traceroute(OsFamily::Windows, "example.com").to_string(),
            "tracert -w 3000 example.com"
        );
    }

    #[test]
    fn test_ping_count_flag() {
        assert_eq!(ping(OsFamily::Unix, "h").to_string(), "ping -c 10 h");
        assert_eq!(ping(OsFamily::Windows, "h").to_string(), "ping -n 10 h");
    }
}
