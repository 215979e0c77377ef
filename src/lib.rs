//! Volley Match Server - deterministic two-side volley simulation
//!
//! The crate contains:
//! - A deterministic physics and rules core stepped at a fixed rate
//! - A binary codec for match states, events and savepoints
//! - Replay recording, loading and seekable playback
//! - An async host running one authoritative worker per match

pub mod config;
pub mod game;
pub mod host;
pub mod net;
pub mod replay;
pub mod util;
