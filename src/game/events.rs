//! Events produced by one simulation tick

use serde::{Deserialize, Serialize};

use super::field::{PlayerSlot, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MatchEventKind {
    BallHitBody = 1,
    BallHitGround = 2,
    BallHitNet = 3,
    BallHitNetTop = 4,
    BallHitWall = 5,
    PlayerError = 6,
    RoundReset = 7,
}

impl MatchEventKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Self::BallHitBody,
            2 => Self::BallHitGround,
            3 => Self::BallHitNet,
            4 => Self::BallHitNetTop,
            5 => Self::BallHitWall,
            6 => Self::PlayerError,
            7 => Self::RoundReset,
            _ => return None,
        })
    }
}

/// A transient per-tick event. Team-level events carry the primary slot of
/// the side involved; `intensity` is only set for `BallHitBody`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub kind: MatchEventKind,
    pub side: Option<PlayerSlot>,
    pub intensity: f32,
}

impl MatchEvent {
    pub fn new(kind: MatchEventKind, side: Option<PlayerSlot>) -> Self {
        Self {
            kind,
            side,
            intensity: 0.0,
        }
    }

    pub fn body_hit(slot: PlayerSlot, intensity: f32) -> Self {
        Self {
            kind: MatchEventKind::BallHitBody,
            side: Some(slot),
            intensity,
        }
    }

    pub fn for_side(kind: MatchEventKind, side: Side) -> Self {
        Self::new(kind, Some(side.primary_slot()))
    }

    /// Team the event refers to, if any
    pub fn team(&self) -> Option<Side> {
        self.side.map(PlayerSlot::side)
    }

    /// The same event as seen from the mirrored seat
    pub fn mirrored(&self) -> Self {
        Self {
            side: self.side.map(PlayerSlot::swapped),
            ..*self
        }
    }
}
