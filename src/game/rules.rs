//! Game rules: scoring, serving and win detection
//!
//! Rules observe physics events relayed by the match and decide when the ball
//! is dead, who serves and who scores. Implementations share the bookkeeping
//! in `LogicCore` and only override the handlers that differ.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::field::{PlayerSlot, Side, MAX_PLAYERS};
use super::input::PlayerInput;
use super::snapshot::LogicState;

/// Ticks during which a repeated contact with the same object is ignored
pub const SQUISH_TOLERANCE: u32 = 11;

/// Consecutive touches a side may make before it is a mistake
pub const MAX_TOUCHES: u32 = 3;

pub const DEFAULT_SCORE_TO_WIN: u32 = 15;

/// Names accepted by `create_rules`
pub const CLASSIC_RULES: &str = "classic";
pub const DUMMY_RULES: &str = "dummy";

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Unknown rules: {0}")]
    UnknownRules(String),

    #[error("Invalid rules descriptor: {0}")]
    InvalidDescriptor(#[from] serde_json::Error),
}

/// Identifies a rule set; stored in replays and announced to seats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesDescriptor {
    pub name: String,
    pub author: String,
    pub score_to_win: u32,
}

impl RulesDescriptor {
    /// Hex encoded SHA-256 over the descriptor fields
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.author.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.score_to_win.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn to_json(&self) -> Result<String, RulesError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Bookkeeping shared by every rule set
#[derive(Debug, Clone)]
pub struct LogicCore {
    descriptor: RulesDescriptor,
    state: LogicState,
    last_error: Option<Side>,
    clock_running: bool,
}

impl LogicCore {
    pub fn new(descriptor: RulesDescriptor) -> Self {
        Self {
            descriptor,
            state: LogicState {
                ball_valid: true,
                ..LogicState::default()
            },
            last_error: None,
            clock_running: true,
        }
    }

    pub fn descriptor(&self) -> &RulesDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> &LogicState {
        &self.state
    }

    pub fn set_state(&mut self, state: LogicState) {
        self.state = state;
    }

    /// Count down the squish timers while the clock runs
    pub fn step(&mut self) {
        if !self.clock_running {
            return;
        }

        let state = &mut self.state;
        state.squish_wall = state.squish_wall.saturating_sub(1);
        state.squish_ground = state.squish_ground.saturating_sub(1);
        for squish in state.squish.iter_mut() {
            *squish = squish.saturating_sub(1);
        }
    }

    /// Register a touch; returns false when the contact is still squished
    pub fn register_body_hit(&mut self, slot: PlayerSlot) -> bool {
        let state = &mut self.state;
        if state.squish[slot.index()] > 0 {
            return false;
        }

        let side = slot.side();
        state.squish[slot.index()] = SQUISH_TOLERANCE;
        // the other team may answer immediately
        for other in PlayerSlot::of_side(side.opposite()) {
            state.squish[other.index()] = 0;
        }

        state.game_running = true;
        state.hit_count[side.opposite().index()] = 0;
        state.hit_count[side.index()] += 1;
        true
    }

    pub fn register_ground_hit(&mut self) -> bool {
        if self.state.squish_ground > 0 || !self.state.ball_valid {
            return false;
        }
        self.state.squish_ground = SQUISH_TOLERANCE;
        true
    }

    /// Walls and the net share one squish timer
    pub fn register_obstacle_hit(&mut self) -> bool {
        if self.state.squish_wall > 0 {
            return false;
        }
        self.state.squish_wall = SQUISH_TOLERANCE;
        true
    }

    /// The ball is dead: `error_side` made the mistake and `serve_side` serves next
    pub fn on_error(&mut self, error_side: Side, serve_side: Side) {
        self.last_error = Some(error_side);
        self.state.ball_valid = false;
        self.state.hit_count = [0; 2];
        self.state.squish = [0; MAX_PLAYERS];
        self.state.serving = Some(serve_side);
    }

    pub fn take_last_error(&mut self) -> Option<Side> {
        self.last_error.take()
    }

    pub fn on_serve(&mut self) {
        self.state.ball_valid = true;
        self.state.game_running = false;
    }

    pub fn add_point(&mut self, side: Side) {
        *self.state.score_mut(side) += 1;
    }

    /// Declare a winner once a side reaches the target with a two point lead
    pub fn check_win(&mut self, side: Side) {
        let own = self.state.score(side);
        let other = self.state.score(side.opposite());
        if own >= self.descriptor.score_to_win && own >= other + 2 {
            self.state.winning = Some(side);
        }
    }

    pub fn set_clock_running(&mut self, running: bool) {
        self.clock_running = running;
    }
}

/// A rule set driving one match
pub trait GameRules: Send {
    fn core(&self) -> &LogicCore;
    fn core_mut(&mut self) -> &mut LogicCore;

    /// A fresh instance of the same rules with zeroed state
    fn clone_fresh(&self) -> Box<dyn GameRules>;

    fn descriptor(&self) -> &RulesDescriptor {
        self.core().descriptor()
    }

    fn transform_input(&self, input: PlayerInput, _slot: PlayerSlot) -> PlayerInput {
        input
    }

    /// Per-tick counter upkeep, called before the physics step
    fn step(&mut self) {
        self.core_mut().step();
    }

    fn on_ball_hits_body(&mut self, slot: PlayerSlot) {
        if self.core_mut().register_body_hit(slot) {
            self.handle_body_hit(slot.side());
        }
    }

    fn on_ball_hits_ground(&mut self, side: Side) {
        if self.core_mut().register_ground_hit() {
            self.handle_ground_hit(side);
        }
    }

    /// `None` when the ball touched the top of the net
    fn on_ball_hits_net(&mut self, side: Option<Side>) {
        if self.core_mut().register_obstacle_hit() {
            self.handle_net_hit(side);
        }
    }

    fn on_ball_hits_wall(&mut self, side: Side) {
        if self.core_mut().register_obstacle_hit() {
            self.handle_wall_hit(side);
        }
    }

    fn handle_body_hit(&mut self, _side: Side) {}
    fn handle_ground_hit(&mut self, _side: Side) {}
    fn handle_net_hit(&mut self, _side: Option<Side>) {}
    fn handle_wall_hit(&mut self, _side: Side) {}

    fn is_ball_valid(&self) -> bool {
        self.core().state().ball_valid
    }

    fn is_game_running(&self) -> bool {
        self.core().state().game_running
    }

    fn serving_side(&self) -> Option<Side> {
        self.core().state().serving
    }

    fn set_serving_side(&mut self, side: Side) {
        let mut state = *self.core().state();
        state.serving = Some(side);
        self.core_mut().set_state(state);
    }

    /// The side that erred since the last call, if any
    fn take_last_error_side(&mut self) -> Option<Side> {
        self.core_mut().take_last_error()
    }

    fn on_serve(&mut self) {
        self.core_mut().on_serve();
    }

    fn score(&self, side: Side) -> u32 {
        self.core().state().score(side)
    }

    fn set_score(&mut self, side: Side, score: u32) {
        let mut state = *self.core().state();
        *state.score_mut(side) = score;
        self.core_mut().set_state(state);
    }

    fn touches(&self, side: Side) -> u32 {
        self.core().state().hit_count[side.index()]
    }

    fn winning_side(&self) -> Option<Side> {
        self.core().state().winning
    }

    fn score_to_win(&self) -> u32 {
        self.core().descriptor().score_to_win
    }

    fn on_pause(&mut self) {
        self.core_mut().set_clock_running(false);
    }

    fn on_unpause(&mut self) {
        self.core_mut().set_clock_running(true);
    }

    fn state(&self) -> LogicState {
        *self.core().state()
    }

    fn set_state(&mut self, state: &LogicState) {
        self.core_mut().set_state(*state);
    }
}

/// Rally scoring: every mistake gives the opponent a point and the serve
#[derive(Debug, Clone)]
pub struct ClassicRules {
    core: LogicCore,
}

impl ClassicRules {
    pub fn new(score_to_win: u32) -> Self {
        Self {
            core: LogicCore::new(RulesDescriptor {
                name: CLASSIC_RULES.to_string(),
                author: "volley_match_server".to_string(),
                score_to_win,
            }),
        }
    }

    fn mistake(&mut self, side: Side) {
        let opponent = side.opposite();
        self.core.on_error(side, opponent);
        self.core.add_point(opponent);
        self.core.check_win(opponent);
    }
}

impl GameRules for ClassicRules {
    fn core(&self) -> &LogicCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LogicCore {
        &mut self.core
    }

    fn clone_fresh(&self) -> Box<dyn GameRules> {
        Box::new(Self::new(self.score_to_win()))
    }

    /// Bodies stand still once the match is decided
    fn transform_input(&self, input: PlayerInput, _slot: PlayerSlot) -> PlayerInput {
        if self.winning_side().is_some() {
            PlayerInput::default()
        } else {
            input
        }
    }

    fn handle_body_hit(&mut self, side: Side) {
        if self.touches(side) > MAX_TOUCHES {
            self.mistake(side);
        }
    }

    fn handle_ground_hit(&mut self, side: Side) {
        self.mistake(side);
    }
}

/// Passive rules for matches whose logic state is decided elsewhere
#[derive(Debug, Clone)]
pub struct DummyRules {
    core: LogicCore,
}

impl DummyRules {
    pub fn new(score_to_win: u32) -> Self {
        Self {
            core: LogicCore::new(RulesDescriptor {
                name: DUMMY_RULES.to_string(),
                author: "volley_match_server".to_string(),
                score_to_win,
            }),
        }
    }
}

impl GameRules for DummyRules {
    fn core(&self) -> &LogicCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LogicCore {
        &mut self.core
    }

    fn clone_fresh(&self) -> Box<dyn GameRules> {
        Box::new(Self::new(self.score_to_win()))
    }

    fn step(&mut self) {}
    fn on_ball_hits_body(&mut self, _slot: PlayerSlot) {}
    fn on_ball_hits_ground(&mut self, _side: Side) {}
    fn on_ball_hits_net(&mut self, _side: Option<Side>) {}
    fn on_ball_hits_wall(&mut self, _side: Side) {}
}

/// Build a rule set by name. A zero `score_to_win` selects the default.
pub fn create_rules(name: &str, score_to_win: u32) -> Result<Box<dyn GameRules>, RulesError> {
    let score_to_win = if score_to_win == 0 {
        DEFAULT_SCORE_TO_WIN
    } else {
        score_to_win
    };

    match name {
        CLASSIC_RULES | "default" => Ok(Box::new(ClassicRules::new(score_to_win))),
        DUMMY_RULES => Ok(Box::new(DummyRules::new(score_to_win))),
        other => Err(RulesError::UnknownRules(other.to_string())),
    }
}

pub fn create_rules_from_descriptor(
    descriptor: &RulesDescriptor,
) -> Result<Box<dyn GameRules>, RulesError> {
    create_rules(&descriptor.name, descriptor.score_to_win)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> Box<dyn GameRules> {
        create_rules("classic", 15).unwrap()
    }

    /// Let every squish timer run out
    fn settle(rules: &mut dyn GameRules) {
        for _ in 0..SQUISH_TOLERANCE {
            rules.step();
        }
    }

    #[test]
    fn factory_resolves_names() {
        assert_eq!(create_rules("default", 0).unwrap().descriptor().name, "classic");
        assert_eq!(create_rules("default", 0).unwrap().score_to_win(), DEFAULT_SCORE_TO_WIN);
        assert_eq!(create_rules("dummy", 5).unwrap().score_to_win(), 5);
        assert!(matches!(
            create_rules("beach", 15),
            Err(RulesError::UnknownRules(name)) if name == "beach"
        ));
    }

    #[test]
    fn first_touch_starts_the_rally() {
        let mut rules = classic();
        assert!(rules.is_ball_valid());
        assert!(!rules.is_game_running());
        rules.on_ball_hits_body(PlayerSlot::Left);
        assert!(rules.is_game_running());
        assert_eq!(rules.touches(Side::Left), 1);
    }

    #[test]
    fn squish_suppresses_double_counting() {
        let mut rules = classic();
        rules.on_ball_hits_body(PlayerSlot::Left);
        rules.step();
        rules.on_ball_hits_body(PlayerSlot::Left);
        assert_eq!(rules.touches(Side::Left), 1);

        settle(rules.as_mut());
        rules.on_ball_hits_body(PlayerSlot::Left);
        assert_eq!(rules.touches(Side::Left), 2);
    }

    #[test]
    fn opponent_touch_resets_counter_and_squish() {
        let mut rules = classic();
        rules.on_ball_hits_body(PlayerSlot::Left);
        rules.on_ball_hits_body(PlayerSlot::Right);
        assert_eq!(rules.touches(Side::Left), 0);
        assert_eq!(rules.touches(Side::Right), 1);
        // left may answer right away
        rules.on_ball_hits_body(PlayerSlot::Left);
        assert_eq!(rules.touches(Side::Left), 1);
    }

    #[test]
    fn fourth_touch_is_a_mistake() {
        let mut rules = classic();
        for _ in 0..MAX_TOUCHES {
            rules.on_ball_hits_body(PlayerSlot::Right);
            settle(rules.as_mut());
        }
        assert!(rules.is_ball_valid());
        assert_eq!(rules.take_last_error_side(), None);

        rules.on_ball_hits_body(PlayerSlot::Right);
        assert!(!rules.is_ball_valid());
        assert_eq!(rules.take_last_error_side(), Some(Side::Right));
        assert_eq!(rules.take_last_error_side(), None);
        assert_eq!(rules.score(Side::Left), 1);
        assert_eq!(rules.serving_side(), Some(Side::Left));
        assert_eq!(rules.touches(Side::Right), 0);
    }

    #[test]
    fn ground_hit_scores_for_the_opponent_once() {
        let mut rules = classic();
        rules.on_ball_hits_ground(Side::Left);
        rules.on_ball_hits_ground(Side::Left);
        settle(rules.as_mut());
        // ball is dead until the next serve
        rules.on_ball_hits_ground(Side::Left);
        assert_eq!(rules.score(Side::Right), 1);
        assert_eq!(rules.serving_side(), Some(Side::Right));

        rules.on_serve();
        assert!(rules.is_ball_valid());
        assert!(!rules.is_game_running());
    }

    #[test]
    fn winning_needs_a_two_point_lead() {
        let mut rules = create_rules("classic", 5).unwrap();
        rules.set_score(Side::Left, 4);
        rules.set_score(Side::Right, 4);

        rules.on_ball_hits_ground(Side::Right);
        assert_eq!(rules.score(Side::Left), 5);
        assert_eq!(rules.winning_side(), None);

        rules.on_serve();
        settle(rules.as_mut());
        rules.on_ball_hits_ground(Side::Right);
        assert_eq!(rules.winning_side(), Some(Side::Left));
        assert!(rules
            .transform_input(PlayerInput::new(true, false, true), PlayerSlot::Right)
            .is_idle());
    }

    #[test]
    fn paused_clock_freezes_squish() {
        let mut rules = classic();
        rules.on_ball_hits_body(PlayerSlot::Left);
        rules.on_pause();
        settle(rules.as_mut());
        rules.on_ball_hits_body(PlayerSlot::Left);
        assert_eq!(rules.touches(Side::Left), 1);

        rules.on_unpause();
        settle(rules.as_mut());
        rules.on_ball_hits_body(PlayerSlot::Left);
        assert_eq!(rules.touches(Side::Left), 2);
    }

    #[test]
    fn dummy_rules_ignore_physics() {
        let mut rules = create_rules("dummy", 0).unwrap();
        rules.on_ball_hits_ground(Side::Left);
        rules.on_ball_hits_body(PlayerSlot::Right);
        assert!(rules.is_ball_valid());
        assert_eq!(rules.score(Side::Right), 0);

        let mut state = rules.state();
        state.left_score = 9;
        rules.set_state(&state);
        assert_eq!(rules.score(Side::Left), 9);
    }

    #[test]
    fn clone_fresh_keeps_configuration_only() {
        let mut rules = create_rules("classic", 7).unwrap();
        rules.set_score(Side::Left, 3);
        let fresh = rules.clone_fresh();
        assert_eq!(fresh.score(Side::Left), 0);
        assert_eq!(fresh.score_to_win(), 7);
    }

    #[test]
    fn descriptor_checksum_tracks_content() {
        let a = create_rules("classic", 15).unwrap().descriptor().clone();
        let b = create_rules("classic", 21).unwrap().descriptor().clone();
        assert_eq!(a.checksum().len(), 64);
        assert_eq!(a.checksum(), a.clone().checksum());
        assert_ne!(a.checksum(), b.checksum());

        let json = a.to_json().unwrap();
        assert_eq!(RulesDescriptor::from_json(&json).unwrap(), a);
        assert!(RulesDescriptor::from_json("{\"name\":1}").is_err());
    }
}
