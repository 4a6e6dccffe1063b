//! Time sources for engine components.
//!
//! Monotonic instants come from tokio's clock so that tests running with
//! paused time (`start_paused = true`) drive cooldowns and TTLs.

use std::time::Instant;

pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Wall-clock Unix milliseconds, for records read by humans.
pub fn unix_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
