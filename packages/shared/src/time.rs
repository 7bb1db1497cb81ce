//! Server clock and JST timestamp rendering.
//!
//! Relay timestamps are Unix epoch milliseconds assigned by the server. They
//! are rendered on the wire as RFC 3339 strings in Japan Standard Time.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};

/// JST is UTC+9 with no daylight saving.
const JST_OFFSET_SECS: i32 = 9 * 3600;

/// Source of server-assigned timestamps.
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in milliseconds.
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        now_millis()
    }
}

/// Clock frozen at a given instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_millis: i64,
}

impl FixedClock {
    pub fn new(fixed_millis: i64) -> Self {
        Self { fixed_millis }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_millis
    }
}

fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a Unix timestamp in milliseconds to a JST `DateTime`.
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn millis_to_jst(timestamp_millis: i64) -> Option<DateTime<FixedOffset>> {
    jst().timestamp_millis_opt(timestamp_millis).single()
}

/// Render a Unix timestamp in milliseconds as RFC 3339 in JST.
///
/// Out-of-range values fall back to the Unix epoch.
pub fn millis_to_jst_rfc3339(timestamp_millis: i64) -> String {
    millis_to_jst(timestamp_millis)
        .unwrap_or_else(|| {
            tracing::warn!(timestamp_millis, "timestamp out of range, rendering epoch");
            DateTime::<Utc>::UNIX_EPOCH.with_timezone(&jst())
        })
        .to_rfc3339()
}
