//! Per-tick player input and pull-based input sources

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Input state of one body for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl PlayerInput {
    pub const LEFT: u8 = 4;
    pub const RIGHT: u8 = 2;
    pub const JUMP: u8 = 1;

    pub fn new(left: bool, right: bool, jump: bool) -> Self {
        Self { left, right, jump }
    }

    /// Pack into the low three bits
    pub fn to_bits(self) -> u8 {
        (if self.left { Self::LEFT } else { 0 })
            | (if self.right { Self::RIGHT } else { 0 })
            | (if self.jump { Self::JUMP } else { 0 })
    }

    /// Unpack from the low three bits; higher bits are ignored
    pub fn from_bits(bits: u8) -> Self {
        Self {
            left: bits & Self::LEFT != 0,
            right: bits & Self::RIGHT != 0,
            jump: bits & Self::JUMP != 0,
        }
    }

    /// Same intent seen from the other side of the field
    pub fn swap_sides(self) -> Self {
        Self {
            left: self.right,
            right: self.left,
            jump: self.jump,
        }
    }

    pub fn is_idle(self) -> bool {
        !(self.left || self.right || self.jump)
    }
}

/// A provider polled once per tick for a body's raw input
pub trait InputSource: Send {
    /// Produce the input for the upcoming tick
    fn update_input(&mut self) -> PlayerInput;

    /// Overwrite the current input (network update, replay, state restore)
    fn set_input(&mut self, input: PlayerInput);
}

/// Holds whatever input was last pushed into it
#[derive(Debug, Clone, Default)]
pub struct BufferedInput {
    current: PlayerInput,
}

impl BufferedInput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSource for BufferedInput {
    fn update_input(&mut self) -> PlayerInput {
        self.current
    }

    fn set_input(&mut self, input: PlayerInput) {
        self.current = input;
    }
}

/// Seeded bot that holds a random action for a random number of ticks
#[derive(Debug, Clone)]
pub struct RandomInput {
    rng: ChaCha8Rng,
    current: PlayerInput,
    hold_ticks: u32,
    /// Inclusive range of ticks an action is held for
    min_hold: u32,
    max_hold: u32,
}

impl RandomInput {
    pub fn new(seed: u64) -> Self {
        Self::with_hold(seed, 5, 40)
    }

    pub fn with_hold(seed: u64, min_hold: u32, max_hold: u32) -> Self {
        let min_hold = min_hold.max(1);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            current: PlayerInput::default(),
            hold_ticks: 0,
            min_hold,
            max_hold: max_hold.max(min_hold),
        }
    }

    fn pick_action(&mut self) -> PlayerInput {
        let horizontal = self.rng.gen_range(0..3u8);
        PlayerInput {
            left: horizontal == 1,
            right: horizontal == 2,
            jump: self.rng.gen_bool(0.3),
        }
    }
}

impl InputSource for RandomInput {
    fn update_input(&mut self) -> PlayerInput {
        if self.hold_ticks == 0 {
            self.current = self.pick_action();
            self.hold_ticks = self.rng.gen_range(self.min_hold..=self.max_hold);
        }
        self.hold_ticks -= 1;
        self.current
    }

    fn set_input(&mut self, input: PlayerInput) {
        self.current = input;
    }
}
