// src/utils/time.rs
//! Wall-clock helpers.

use chrono::Utc;

/// Current time in whole unix seconds.
pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
