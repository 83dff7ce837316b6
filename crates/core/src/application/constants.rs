// Diagnostic constants (fixed by design: the target, timeouts and counts are not configurable)
use std::time::Duration;

/// Endpoint every probe except IP info targets
pub const TARGET_ENDPOINT: &str = "routing-info-production.up.railway.app";

/// Public IP-info service queried by the first probe
pub const IP_INFO_URL: &str = "https://ipinfo.io/json";

/// Resolver used by the second DNS lookup
pub const ALTERNATE_RESOLVER: &str = "1.1.1.1";

/// Report label of the alternate resolver
pub const ALTERNATE_RESOLVER_NAME: &str = "Cloudflare DNS";

/// User agent sent with the HEAD probe
pub const USER_AGENT: &str = "Railway-Network-Debug/1.0";

/// Timeout for both HTTP-based probes (10s)
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Echo requests sent by the ping probe
pub const PING_COUNT: u32 = 10;

/// Queries per hop for traceroute on Unix-like hosts
pub const TRACEROUTE_QUERIES_PER_HOP: u32 = 2;

/// Per-probe wait for traceroute on Unix-like hosts (seconds)
pub const TRACEROUTE_WAIT_SECS: u32 = 3;

/// Per-probe wait for tracert on Windows (milliseconds)
pub const TRACERT_WAIT_MS: u32 = 3000;

/// Streaming tools that print nothing for this long are killed (30s)
pub const FIRST_OUTPUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cosmetic pause between steps (100ms)
pub const STEP_PAUSE: Duration = Duration::from_millis(100);

/// Width of the rules drawn around step headings
pub const SEPARATOR_WIDTH: usize = 79;

/// Default update channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Graceful process shutdown timeout before SIGKILL (2 seconds)
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
