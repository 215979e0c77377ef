//! Match state snapshots and the side-mirroring transform
//!
//! A `MatchState` is the single unit exchanged over the network, stored in
//! pause checkpoints and written as replay savepoints. Mirroring presents the
//! same authoritative state to a seat on the other side of the field. All
//! mirror operations are negations and swaps, so mirroring twice restores the
//! original bit for bit.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::field::{PlayerSlot, Side, MAX_PLAYERS};
use super::input::PlayerInput;

/// Serializable subset of the physics world
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsState {
    pub body_position: [Vec2; MAX_PLAYERS],
    pub body_velocity: [Vec2; MAX_PLAYERS],
    /// Cosmetic squash animation value, kept in sync for observers
    pub body_posture: [f32; MAX_PLAYERS],
    pub body_animation_speed: [f32; MAX_PLAYERS],
    pub enabled: [bool; MAX_PLAYERS],

    pub ball_position: Vec2,
    pub ball_velocity: Vec2,
    pub ball_rotation: f32,
    pub ball_angular_velocity: f32,
}

impl PhysicsState {
    pub fn mirror(&self) -> Self {
        let mut out = *self;
        for i in (0..MAX_PLAYERS).step_by(2) {
            for slot in [i, i + 1] {
                out.body_position[slot].x = -out.body_position[slot].x;
                out.body_velocity[slot].x = -out.body_velocity[slot].x;
            }
            out.body_position.swap(i, i + 1);
            out.body_velocity.swap(i, i + 1);
            out.body_posture.swap(i, i + 1);
            out.body_animation_speed.swap(i, i + 1);
            out.enabled.swap(i, i + 1);
        }

        out.ball_position.x = -out.ball_position.x;
        out.ball_velocity.x = -out.ball_velocity.x;
        out.ball_angular_velocity = -out.ball_angular_velocity;
        // same angle modulo a full turn as 2*PI - rotation, but exact
        out.ball_rotation = -out.ball_rotation;
        out
    }
}

/// Rules bookkeeping that must survive checkpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicState {
    pub serving: Option<Side>,
    pub winning: Option<Side>,
    pub left_score: u32,
    pub right_score: u32,
    /// Consecutive touches per side
    pub hit_count: [u32; 2],
    /// Per-slot cooldown preventing one contact from counting twice
    pub squish: [u32; MAX_PLAYERS],
    pub squish_wall: u32,
    pub squish_ground: u32,
    pub game_running: bool,
    pub ball_valid: bool,
}

impl LogicState {
    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left_score,
            Side::Right => self.right_score,
        }
    }

    pub fn score_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Left => &mut self.left_score,
            Side::Right => &mut self.right_score,
        }
    }

    pub fn mirror(&self) -> Self {
        let mut out = *self;
        std::mem::swap(&mut out.left_score, &mut out.right_score);
        out.hit_count.swap(0, 1);
        for i in (0..MAX_PLAYERS).step_by(2) {
            out.squish.swap(i, i + 1);
        }
        out.serving = out.serving.map(Side::opposite);
        out.winning = out.winning.map(Side::opposite);
        out
    }
}

/// Physics, logic and the inputs applied in the last tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub physics: PhysicsState,
    pub logic: LogicState,
    pub inputs: [PlayerInput; MAX_PLAYERS],
}

impl MatchState {
    /// The state as seen from a seat on the other side of the field
    pub fn mirror(&self) -> Self {
        let mut inputs = self.inputs;
        for i in (0..MAX_PLAYERS).step_by(2) {
            inputs[i] = inputs[i].swap_sides();
            inputs[i + 1] = inputs[i + 1].swap_sides();
            inputs.swap(i, i + 1);
        }

        Self {
            physics: self.physics.mirror(),
            logic: self.logic.mirror(),
            inputs,
        }
    }

    pub fn body_position(&self, slot: PlayerSlot) -> Vec2 {
        self.physics.body_position[slot.index()]
    }

    pub fn body_velocity(&self, slot: PlayerSlot) -> Vec2 {
        self.physics.body_velocity[slot.index()]
    }

    pub fn body_posture(&self, slot: PlayerSlot) -> f32 {
        self.physics.body_posture[slot.index()]
    }

    pub fn ball_position(&self) -> Vec2 {
        self.physics.ball_position
    }

    pub fn ball_velocity(&self) -> Vec2 {
        self.physics.ball_velocity
    }

    pub fn ball_rotation(&self) -> f32 {
        self.physics.ball_rotation
    }

    pub fn serving_side(&self) -> Option<Side> {
        self.logic.serving
    }

    pub fn winning_side(&self) -> Option<Side> {
        self.logic.winning
    }

    /// Ball has been ruled dead; the round is between serves
    pub fn ball_down(&self) -> bool {
        !self.logic.ball_valid
    }

    pub fn ball_active(&self) -> bool {
        self.logic.game_running
    }

    pub fn score(&self, side: Side) -> u32 {
        self.logic.score(side)
    }

    pub fn hit_count(&self, side: Side) -> u32 {
        self.logic.hit_count[side.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> MatchState {
        let mut state = MatchState::default();
        state.physics.body_position = [
            Vec2::new(-123.456_79, 455.5),
            Vec2::new(87.125, 401.3),
            Vec2::new(-300.1, 455.5),
            Vec2::new(250.0, 430.0),
        ];
        state.physics.body_velocity = [
            Vec2::new(4.5, -15.1),
            Vec2::new(-4.5, 0.0),
            Vec2::new(0.0, 3.3),
            Vec2::new(2.5, -1.0),
        ];
        state.physics.body_posture = [0.5, 1.0, 4.99, 0.0];
        state.physics.enabled = [true, true, true, false];
        state.physics.ball_position = Vec2::new(-17.333_3, 250.25);
        state.physics.ball_velocity = Vec2::new(12.961_481, -3.141_5);
        state.physics.ball_rotation = 5.123_4;
        state.physics.ball_angular_velocity = 0.1;
        state.logic = LogicState {
            serving: Some(Side::Left),
            winning: None,
            left_score: 7,
            right_score: 3,
            hit_count: [2, 0],
            squish: [11, 0, 4, 0],
            squish_wall: 1,
            squish_ground: 0,
            game_running: true,
            ball_valid: true,
        };
        state.inputs = [
            PlayerInput::new(true, false, true),
            PlayerInput::new(false, true, false),
            PlayerInput::new(false, false, true),
            PlayerInput::default(),
        ];
        state
    }

    #[test]
    fn mirror_is_an_involution() {
        let state = sample_state();
        assert_eq!(state.mirror().mirror(), state);
        assert_eq!(state.physics.mirror().mirror(), state.physics);
        assert_eq!(state.logic.mirror().mirror(), state.logic);
    }

    #[test]
    fn mirror_exchanges_sides() {
        let state = sample_state();
        let mirrored = state.mirror();

        assert_eq!(mirrored.logic.left_score, 3);
        assert_eq!(mirrored.logic.right_score, 7);
        assert_eq!(mirrored.logic.hit_count, [0, 2]);
        assert_eq!(mirrored.logic.squish, [0, 11, 0, 4]);
        assert_eq!(mirrored.serving_side(), Some(Side::Right));

        // left body now sits in the right slot, reflected about the net
        assert_eq!(
            mirrored.body_position(PlayerSlot::Right),
            Vec2::new(123.456_79, 455.5)
        );
        assert_eq!(mirrored.body_velocity(PlayerSlot::Right).x, -4.5);
        assert_eq!(mirrored.physics.enabled, [true, true, false, true]);
        assert_eq!(mirrored.ball_position().x, 17.333_3);
        assert_eq!(mirrored.physics.ball_angular_velocity, -0.1);

        // a left player pressing "left" becomes a right player pressing "right"
        assert_eq!(mirrored.inputs[1], PlayerInput::new(false, true, true));
        assert_eq!(mirrored.inputs[0], PlayerInput::new(true, false, false));
    }

    #[test]
    fn score_accessors_follow_side() {
        let state = sample_state();
        assert_eq!(state.score(Side::Left), 7);
        assert_eq!(state.hit_count(Side::Left), 2);
        assert!(!state.ball_down());
        assert!(state.ball_active());
    }
}
