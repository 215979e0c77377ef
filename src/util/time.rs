//! Time utilities for the fixed-step simulation

use std::time::Duration;

use chrono::{TimeZone, Utc};

/// Default simulation rate in ticks per second
pub const DEFAULT_GAME_SPEED: u32 = 75;

/// Wall-clock length of one tick at `game_speed` ticks per second
pub fn tick_duration(game_speed: u32) -> Duration {
    Duration::from_micros(1_000_000 / game_speed.max(1) as u64)
}

/// Whole seconds covered by `ticks` at `game_speed`
pub fn ticks_to_seconds(ticks: u64, game_speed: u32) -> u64 {
    ticks / game_speed.max(1) as u64
}

/// Get current Unix timestamp in seconds
pub fn unix_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Human readable UTC date for a Unix timestamp, used in replay file names
pub fn format_unix_seconds(seconds: i64) -> String {
    match Utc.timestamp_opt(seconds, 0).single() {
        Some(date) => date.format("%Y-%m-%d_%H-%M-%S").to_string(),
        None => seconds.to_string(),
    }
}
