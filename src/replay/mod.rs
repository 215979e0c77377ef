//! Match recordings: packed per-tick input plus periodic state savepoints
//!
//! A savepoint holds the state *before* its tick was simulated, and the input
//! byte of that tick is the input the physics consumed. Restoring any
//! savepoint and feeding the recorded input forward reproduces the match.

pub mod loader;
pub mod player;
pub mod recorder;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::field::{PlayerSlot, MAX_PLAYERS};
use crate::game::input::PlayerInput;
use crate::game::rules::RulesError;
use crate::game::snapshot::MatchState;
use crate::net::codec::CodecError;

pub use loader::ReplayLoader;
pub use player::ReplayPlayer;
pub use recorder::ReplayRecorder;

pub const REPLAY_FILE_VERSION_MAJOR: u32 = 2;
pub const REPLAY_FILE_VERSION_MINOR: u32 = 1;

/// Ticks between two periodic savepoints
pub const SAVEPOINT_PERIOD: u64 = 750;

/// Set on every recorded input byte; padding bytes stay zero
pub const INPUT_MARKER: u8 = 0x80;

/// Replay variable names
pub(crate) const VAR_GAME_SPEED: &str = "game_speed";
pub(crate) const VAR_GAME_LENGTH: &str = "game_length";
pub(crate) const VAR_GAME_DURATION: &str = "game_duration";
pub(crate) const VAR_GAME_DATE: &str = "game_date";
pub(crate) const VAR_SCORE_LEFT: &str = "score_left";
pub(crate) const VAR_SCORE_RIGHT: &str = "score_right";

/// Full match state at the start of `tick`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySavePoint {
    pub tick: u64,
    pub state: MatchState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayVersion {
    pub major: u32,
    pub minor: u32,
}

impl ReplayVersion {
    pub const CURRENT: ReplayVersion = ReplayVersion {
        major: REPLAY_FILE_VERSION_MAJOR,
        minor: REPLAY_FILE_VERSION_MINOR,
    };
}

/// On-disk envelope. Every field is optional here so that the loader can
/// report exactly which one is missing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ReplayFile {
    pub version: Option<ReplayVersion>,
    pub vars: Option<BTreeMap<String, serde_json::Value>>,
    /// Rules descriptor as JSON text
    pub rules: Option<String>,
    /// Base64 packed input log
    pub input: Option<String>,
    /// Base64 encoded savepoint list
    pub states: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed replay file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Malformed savepoint data: {0}")]
    Codec(#[from] CodecError),

    #[error("Unsupported replay version {major}.{minor}")]
    VersionMismatch { major: u32, minor: u32 },

    #[error("Missing replay field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidField { name: String, value: String },

    #[error("Input log has {actual} bytes, expected {expected}")]
    InputLengthMismatch { expected: usize, actual: usize },

    #[error("Replay contains no players")]
    NoPlayers,

    #[error("Tick {0} is outside the recording")]
    TickOutOfRange(u64),

    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),
}

/// Per-slot name prefix of the `name_*` and `color_*` variables
pub(crate) fn name_var(slot: PlayerSlot) -> String {
    format!("name_{}", slot.prefix())
}

pub(crate) fn color_var(slot: PlayerSlot) -> String {
    format!("color_{}", slot.prefix())
}

/// Input bytes per tick for the given enabled slots
pub fn bytes_per_step(enabled: &[bool; MAX_PLAYERS]) -> usize {
    let players = enabled.iter().filter(|e| **e).count();
    (players + 1) / 2
}

/// Input log length for `ticks` ticks; fails when it cannot be addressed
pub(crate) fn input_len(enabled: &[bool; MAX_PLAYERS], ticks: u64) -> Result<usize, ReplayError> {
    usize::try_from(ticks)
        .ok()
        .and_then(|ticks| bytes_per_step(enabled).checked_mul(ticks))
        .ok_or_else(|| ReplayError::InvalidField {
            name: VAR_GAME_LENGTH.to_string(),
            value: ticks.to_string(),
        })
}

/// Pack the enabled slots' inputs, two per byte: first at bits 5..3, second
/// at bits 2..0
pub fn pack_inputs(
    enabled: &[bool; MAX_PLAYERS],
    inputs: &[PlayerInput; MAX_PLAYERS],
    out: &mut Vec<u8>,
) {
    let active = PlayerSlot::ALL.into_iter().filter(|slot| enabled[slot.index()]);
    let mut pending: Option<u8> = None;

    for slot in active {
        let bits = inputs[slot.index()].to_bits();
        match pending.take() {
            None => pending = Some(bits),
            Some(first) => out.push(INPUT_MARKER | first << 3 | bits),
        }
    }
    if let Some(first) = pending {
        out.push(INPUT_MARKER | first << 3);
    }
}

/// Inverse of `pack_inputs`; `bytes` must hold one tick
pub fn unpack_inputs(enabled: &[bool; MAX_PLAYERS], bytes: &[u8]) -> [PlayerInput; MAX_PLAYERS] {
    let mut inputs = [PlayerInput::default(); MAX_PLAYERS];
    let active = PlayerSlot::ALL.into_iter().filter(|slot| enabled[slot.index()]);

    for (n, slot) in active.enumerate() {
        let Some(byte) = bytes.get(n / 2) else {
            break;
        };
        let bits = if n % 2 == 0 { byte >> 3 } else { *byte };
        inputs[slot.index()] = PlayerInput::from_bits(bits & 0b111);
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duel_inputs_share_one_byte() {
        let enabled = [true, true, false, false];
        let inputs = [
            PlayerInput::new(true, false, true),
            PlayerInput::new(false, true, false),
            PlayerInput::default(),
            PlayerInput::default(),
        ];
        let mut out = Vec::new();
        pack_inputs(&enabled, &inputs, &mut out);
        assert_eq!(out, vec![0x80 | 0b101 << 3 | 0b010]);
        assert_eq!(unpack_inputs(&enabled, &out), inputs);
    }

    #[test]
    fn odd_player_count_leaves_low_bits_empty() {
        let enabled = [true, true, true, false];
        assert_eq!(bytes_per_step(&enabled), 2);

        let inputs = [
            PlayerInput::new(false, false, true),
            PlayerInput::new(true, false, false),
            PlayerInput::new(false, true, true),
            PlayerInput::default(),
        ];
        let mut out = Vec::new();
        pack_inputs(&enabled, &inputs, &mut out);
        assert_eq!(out, vec![0x80 | 0b001 << 3 | 0b100, 0x80 | 0b011 << 3]);
        assert_eq!(unpack_inputs(&enabled, &out), inputs);
    }

    #[test]
    fn skipped_slots_are_not_packed() {
        // right and right2 only: both land in the same byte
        let enabled = [false, true, false, true];
        let inputs = [
            PlayerInput::new(true, true, true),
            PlayerInput::new(true, false, false),
            PlayerInput::new(true, true, true),
            PlayerInput::new(false, false, true),
        ];
        let mut out = Vec::new();
        pack_inputs(&enabled, &inputs, &mut out);
        assert_eq!(out, vec![0x80 | 0b100 << 3 | 0b001]);

        let unpacked = unpack_inputs(&enabled, &out);
        assert!(unpacked[0].is_idle());
        assert_eq!(unpacked[3], inputs[3]);
    }

    #[test]
    fn input_len_rejects_unaddressable_lengths() {
        let enabled = [true, true, false, false];
        assert_eq!(input_len(&enabled, 75).unwrap(), 75);
        assert!(matches!(
            input_len(&[true; MAX_PLAYERS], u64::MAX),
            Err(ReplayError::InvalidField { .. })
        ));
    }

    #[test]
    fn padding_bytes_decode_as_idle() {
        let enabled = [true; MAX_PLAYERS];
        let unpacked = unpack_inputs(&enabled, &[0, 0]);
        assert!(unpacked.iter().all(|input| input.is_idle()));
    }
}
