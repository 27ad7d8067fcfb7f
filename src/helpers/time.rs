use chrono::{SecondsFormat, Utc};
use tokio::time::Instant;

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// Whole seconds left until `expires_at_ms`, never below `floor_seconds`.
pub fn remaining_seconds_floored(expires_at_ms: i64, floor_seconds: u64) -> u64 {
    let remaining = (expires_at_ms - now_millis()).max(0) / 1000;
    (remaining as u64).max(floor_seconds)
}
