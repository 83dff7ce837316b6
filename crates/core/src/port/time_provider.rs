// Time Provider Port (for testability)

use chrono::{DateTime, Local};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Current local wall-clock time (used in report banners)
    fn now(&self) -> DateTime<Local>;

    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Frozen clock for deterministic banners in tests
pub struct FixedTimeProvider(pub DateTime<Local>);

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}
