//! Match orchestration: one authoritative simulation tick
//!
//! `GameMatch` glues input sources, the physics world and the rules together.
//! Every tick collects input, runs rules upkeep and physics, relays the
//! physics events to the rules, then checks for mistakes and round resets.

use glam::Vec2;
use tracing::debug;

use super::events::{MatchEvent, MatchEventKind};
use super::field::*;
use super::input::{BufferedInput, InputSource, PlayerInput};
use super::physics::PhysicsWorld;
use super::rules::{GameRules, RulesDescriptor};
use super::snapshot::MatchState;

/// A serve may start once the ball moves vertically slower than this
pub const SERVE_MAX_BALL_SPEED_Y: f32 = 1.5;
/// ... and lies lower than this
pub const SERVE_MIN_BALL_HEIGHT: f32 = 430.0;
/// Velocity factor applied to a dead ball on impact
pub const INVALID_BALL_DAMPING: f32 = 0.6;

/// Who is authoritative for the rules of this match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Rules are evaluated here and may transform input
    Local,
    /// State arrives from elsewhere; only injected events are published
    Remote,
    /// Recorded input is replayed without transformation
    Playback,
}

pub struct GameMatch {
    mode: MatchMode,
    physics: PhysicsWorld,
    rules: Box<dyn GameRules>,
    input_sources: [Box<dyn InputSource>; MAX_PLAYERS],
    applied_inputs: [PlayerInput; MAX_PLAYERS],
    pending_events: Vec<MatchEvent>,
    last_events: Vec<MatchEvent>,
    paused: bool,
    tick: u64,
}

impl GameMatch {
    pub fn new(mode: MatchMode, rules: Box<dyn GameRules>, enabled: [bool; MAX_PLAYERS]) -> Self {
        Self {
            mode,
            physics: PhysicsWorld::new(enabled),
            rules,
            input_sources: std::array::from_fn(|_| {
                Box::new(BufferedInput::new()) as Box<dyn InputSource>
            }),
            applied_inputs: [PlayerInput::default(); MAX_PLAYERS],
            pending_events: Vec::new(),
            last_events: Vec::new(),
            paused: false,
            tick: 0,
        }
    }

    /// Advance the match by one tick. Does nothing while paused.
    pub fn step(&mut self) {
        if self.paused {
            return;
        }

        for slot in PlayerSlot::ALL {
            if !self.physics.player_enabled(slot) {
                continue;
            }
            let raw = self.input_sources[slot.index()].update_input();
            self.applied_inputs[slot.index()] = match self.mode {
                MatchMode::Local => self.rules.transform_input(raw, slot),
                MatchMode::Remote | MatchMode::Playback => raw,
            };
        }

        self.rules.step();
        let physics_events = self.physics.step(
            &self.applied_inputs,
            self.rules.is_ball_valid(),
            self.rules.is_game_running(),
        );
        if self.mode != MatchMode::Remote {
            self.pending_events.extend(physics_events);
        }

        for i in 0..self.pending_events.len() {
            let event = self.pending_events[i];
            self.relay_event(event);
        }

        if let Some(side) = self.rules.take_last_error_side() {
            self.pending_events
                .push(MatchEvent::for_side(MatchEventKind::PlayerError, side));
            self.damp_ball();
        }

        if !self.rules.is_ball_valid() && self.can_start_round(self.rules.serving_side()) {
            debug!(tick = self.tick, serving = ?self.rules.serving_side(), "Round reset");
            self.reset_ball(self.rules.serving_side());
            self.rules.on_serve();
            self.pending_events
                .push(MatchEvent::new(MatchEventKind::RoundReset, None));
        }

        self.last_events = std::mem::take(&mut self.pending_events);
        self.tick += 1;
    }

    fn relay_event(&mut self, event: MatchEvent) {
        match (event.kind, event.side) {
            (MatchEventKind::BallHitBody, Some(slot)) => self.rules.on_ball_hits_body(slot),
            (MatchEventKind::BallHitGround, Some(slot)) => {
                self.rules.on_ball_hits_ground(slot.side());
                if !self.rules.is_ball_valid() {
                    self.damp_ball();
                }
            }
            (MatchEventKind::BallHitNet, Some(slot)) => self.rules.on_ball_hits_net(Some(slot.side())),
            (MatchEventKind::BallHitNetTop, _) => self.rules.on_ball_hits_net(None),
            (MatchEventKind::BallHitWall, Some(slot)) => self.rules.on_ball_hits_wall(slot.side()),
            _ => {}
        }
    }

    fn damp_ball(&mut self) {
        let velocity = self.physics.ball_velocity();
        self.physics
            .set_ball_velocity(velocity * INVALID_BALL_DAMPING);
    }

    /// The serving team stands on the ground and the ball has settled low
    fn can_start_round(&self, serving: Option<Side>) -> bool {
        let Some(side) = serving else {
            return false;
        };
        let server = self.serving_slot(side);
        let ball_velocity = self.physics.ball_velocity();

        self.physics.body_grounded(server)
            && ball_velocity.y < SERVE_MAX_BALL_SPEED_Y
            && ball_velocity.y > -SERVE_MAX_BALL_SPEED_Y
            && self.physics.ball_position().y > SERVE_MIN_BALL_HEIGHT
    }

    /// First enabled body of the side, so a team keeps serving after its
    /// primary player left
    fn serving_slot(&self, side: Side) -> PlayerSlot {
        PlayerSlot::of_side(side)
            .find(|slot| self.physics.player_enabled(*slot))
            .unwrap_or_else(|| side.primary_slot())
    }

    fn reset_ball(&mut self, side: Option<Side>) {
        let position = match side {
            Some(side) => Vec2::new(side.serve_x(), STANDARD_BALL_HEIGHT),
            None => Vec2::new(NET_POSITION_X, NEUTRAL_BALL_HEIGHT),
        };
        let spin = match side {
            Some(Side::Right) => -STANDARD_BALL_ANGULAR_VELOCITY,
            _ => STANDARD_BALL_ANGULAR_VELOCITY,
        };

        self.physics.set_ball_position(position);
        self.physics.set_ball_velocity(Vec2::ZERO);
        self.physics.set_ball_angular_velocity(spin);
    }

    /// Inject an externally decided event into the current tick
    pub fn trigger(&mut self, event: MatchEvent) {
        self.pending_events.push(event);
    }

    pub fn pause(&mut self) {
        self.rules.on_pause();
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.rules.on_unpause();
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Restart with fresh physics and rules, keeping the enabled slots
    pub fn reset(&mut self) {
        self.physics = PhysicsWorld::new(self.physics.enabled_slots());
        self.rules = self.rules.clone_fresh();
        self.applied_inputs = [PlayerInput::default(); MAX_PLAYERS];
        self.pending_events.clear();
        self.last_events.clear();
        self.tick = 0;
    }

    pub fn state(&self) -> MatchState {
        let mut inputs = [PlayerInput::default(); MAX_PLAYERS];
        for slot in PlayerSlot::ALL {
            if self.physics.player_enabled(slot) {
                inputs[slot.index()] = self.applied_inputs[slot.index()];
            }
        }

        MatchState {
            physics: self.physics.state(),
            logic: self.rules.state(),
            inputs,
        }
    }

    pub fn set_state(&mut self, state: &MatchState) {
        self.physics.set_state(&state.physics);
        self.rules.set_state(&state.logic);

        for slot in PlayerSlot::ALL {
            if self.physics.player_enabled(slot) {
                let input = state.inputs[slot.index()];
                self.applied_inputs[slot.index()] = input;
                self.input_sources[slot.index()].set_input(input);
            }
        }
    }

    pub fn set_input_source(&mut self, slot: PlayerSlot, source: Box<dyn InputSource>) {
        self.input_sources[slot.index()] = source;
    }

    pub fn input_source_mut(&mut self, slot: PlayerSlot) -> &mut dyn InputSource {
        self.input_sources[slot.index()].as_mut()
    }

    pub fn set_player_enabled(&mut self, slot: PlayerSlot, enabled: bool) {
        self.physics.set_player_enabled(slot, enabled);
    }

    pub fn player_enabled(&self, slot: PlayerSlot) -> bool {
        self.physics.player_enabled(slot)
    }

    pub fn enabled_slots(&self) -> [bool; MAX_PLAYERS] {
        self.physics.enabled_slots()
    }

    pub fn players_in_team(&self, side: Side) -> usize {
        PlayerSlot::of_side(side)
            .filter(|slot| self.physics.player_enabled(*slot))
            .count()
    }

    /// Hand the serve to `side` and place the ball immediately
    pub fn set_serving_side(&mut self, side: Side) {
        self.rules.set_serving_side(side);
        self.reset_ball(Some(side));
        self.rules.on_serve();
    }

    pub fn set_score(&mut self, left: u32, right: u32) {
        self.rules.set_score(Side::Left, left);
        self.rules.set_score(Side::Right, right);
    }

    pub fn score(&self, side: Side) -> u32 {
        self.rules.score(side)
    }

    pub fn touches(&self, side: Side) -> u32 {
        self.rules.touches(side)
    }

    pub fn score_to_win(&self) -> u32 {
        self.rules.score_to_win()
    }

    pub fn serving_side(&self) -> Option<Side> {
        self.rules.serving_side()
    }

    pub fn winning_side(&self) -> Option<Side> {
        self.rules.winning_side()
    }

    pub fn ball_down(&self) -> bool {
        !self.rules.is_ball_valid()
    }

    pub fn ball_active(&self) -> bool {
        self.rules.is_game_running()
    }

    pub fn body_jumping(&self, slot: PlayerSlot) -> bool {
        !self.physics.body_grounded(slot)
    }

    pub fn body_position(&self, slot: PlayerSlot) -> Vec2 {
        self.physics.body_position(slot)
    }

    pub fn body_velocity(&self, slot: PlayerSlot) -> Vec2 {
        self.physics.body_velocity(slot)
    }

    pub fn ball_position(&self) -> Vec2 {
        self.physics.ball_position()
    }

    pub fn ball_velocity(&self) -> Vec2 {
        self.physics.ball_velocity()
    }

    pub fn rules_descriptor(&self) -> &RulesDescriptor {
        self.rules.descriptor()
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Events published by the most recent tick
    pub fn last_events(&self) -> &[MatchEvent] {
        &self.last_events
    }

    /// Inputs the last tick fed into physics, after rules transformation
    pub fn applied_inputs(&self) -> [PlayerInput; MAX_PLAYERS] {
        self.applied_inputs
    }

    /// Number of ticks simulated so far
    pub fn tick(&self) -> u64 {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::RandomInput;
    use crate::game::rules::create_rules;

    const DUEL: [bool; MAX_PLAYERS] = [true, true, false, false];

    fn local_match() -> GameMatch {
        GameMatch::new(MatchMode::Local, create_rules("classic", 15).unwrap(), DUEL)
    }

    fn drop_ball(game: &mut GameMatch, position: Vec2, ball_valid: bool, serving: Option<Side>) {
        let mut state = game.state();
        state.physics.ball_position = position;
        state.physics.ball_velocity = Vec2::ZERO;
        state.logic.ball_valid = ball_valid;
        state.logic.game_running = true;
        state.logic.serving = serving;
        game.set_state(&state);
    }

    #[test]
    fn dead_ball_is_reset_once_it_settles() {
        let mut game = local_match();
        drop_ball(&mut game, Vec2::new(-100.0, 300.0), false, Some(Side::Left));

        let mut resets = 0;
        for _ in 0..1000 {
            game.step();
            resets += game
                .last_events()
                .iter()
                .filter(|e| e.kind == MatchEventKind::RoundReset)
                .count();
        }

        assert_eq!(resets, 1);
        assert_eq!(game.ball_position(), Vec2::new(LEFT_SERVE_X, STANDARD_BALL_HEIGHT));
        assert_eq!(game.ball_velocity(), Vec2::ZERO);
        assert!(!game.ball_down());
        assert!(!game.ball_active());
        assert_eq!(game.score(Side::Left), 0);
        assert_eq!(game.score(Side::Right), 0);
    }

    #[test]
    fn grounded_ball_scores_for_the_other_side() {
        let mut game = local_match();
        drop_ball(&mut game, Vec2::new(300.0, 300.0), true, Some(Side::Right));

        for _ in 0..200 {
            game.step();
            let events = game.last_events();
            if events.iter().any(|e| e.kind == MatchEventKind::BallHitGround) {
                let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
                assert_eq!(
                    kinds,
                    vec![MatchEventKind::BallHitGround, MatchEventKind::PlayerError]
                );
                assert_eq!(events[1].team(), Some(Side::Right));
                assert_eq!(game.score(Side::Left), 1);
                assert_eq!(game.serving_side(), Some(Side::Left));
                assert!(game.ball_down());
                return;
            }
        }
        panic!("ball never landed");
    }

    #[test]
    fn paused_match_does_not_advance() {
        let mut game = local_match();
        game.step();
        let before = game.state();
        game.pause();
        for _ in 0..10 {
            game.step();
        }
        assert_eq!(game.state(), before);
        assert_eq!(game.tick(), 1);
        game.unpause();
        game.step();
        assert_eq!(game.tick(), 2);
    }

    #[test]
    fn identical_matches_stay_identical() {
        let mut a = local_match();
        let mut b = local_match();
        for (seed, slot) in [(7, PlayerSlot::Left), (8, PlayerSlot::Right)] {
            a.set_input_source(slot, Box::new(RandomInput::new(seed)));
            b.set_input_source(slot, Box::new(RandomInput::new(seed)));
        }
        for _ in 0..3000 {
            a.step();
            b.step();
            assert_eq!(a.state(), b.state());
            assert_eq!(a.last_events(), b.last_events());
        }
    }

    #[test]
    fn restored_state_continues_identically() {
        let mut original = local_match();
        original.set_input_source(PlayerSlot::Left, Box::new(RandomInput::new(1)));
        original.set_input_source(PlayerSlot::Right, Box::new(RandomInput::new(2)));
        for _ in 0..500 {
            original.step();
        }
        original.set_input_source(PlayerSlot::Left, Box::new(BufferedInput::new()));
        original.set_input_source(PlayerSlot::Right, Box::new(BufferedInput::new()));

        let mut copy = local_match();
        copy.set_state(&original.state());
        assert_eq!(copy.state(), original.state());

        for tick in 0..500u32 {
            let input = PlayerInput::from_bits((tick % 8) as u8);
            original.input_source_mut(PlayerSlot::Left).set_input(input);
            copy.input_source_mut(PlayerSlot::Left).set_input(input);
            original.input_source_mut(PlayerSlot::Right).set_input(input.swap_sides());
            copy.input_source_mut(PlayerSlot::Right).set_input(input.swap_sides());
            original.step();
            copy.step();
        }
        assert_eq!(copy.state(), original.state());
    }

    #[test]
    fn remote_match_publishes_only_injected_events() {
        let mut game = GameMatch::new(MatchMode::Remote, create_rules("dummy", 0).unwrap(), DUEL);
        drop_ball(&mut game, Vec2::new(-100.0, 440.0), true, None);

        game.step();
        assert!(game.last_events().is_empty());

        game.trigger(MatchEvent::for_side(MatchEventKind::PlayerError, Side::Left));
        game.step();
        assert_eq!(game.last_events().len(), 1);
        assert_eq!(game.last_events()[0].kind, MatchEventKind::PlayerError);
    }

    #[test]
    fn serve_places_ball_with_side_dependent_spin() {
        let mut game = local_match();
        game.set_serving_side(Side::Right);
        assert_eq!(game.ball_position(), Vec2::new(RIGHT_SERVE_X, STANDARD_BALL_HEIGHT));
        assert_eq!(
            game.state().physics.ball_angular_velocity,
            -STANDARD_BALL_ANGULAR_VELOCITY
        );
        assert_eq!(game.serving_side(), Some(Side::Right));
    }

    #[test]
    fn reset_keeps_slots_and_clears_score() {
        let mut game = local_match();
        game.set_score(4, 2);
        game.step();
        game.reset();
        assert_eq!(game.score(Side::Left), 0);
        assert_eq!(game.tick(), 0);
        assert_eq!(game.players_in_team(Side::Left), 1);
        assert_eq!(game.players_in_team(Side::Right), 1);
    }
}
