//! Time utility functions

use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current timestamp in milliseconds
///
/// A clock set before the epoch reads as 0.
pub fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or_default()
}

/// Next timestamp strictly after `last`: wall-clock milliseconds when the
/// clock is ahead, `last + 1` otherwise.
pub fn next_after(last: u64, now: u64) -> u64 {
  now.max(last.saturating_add(1))
}
