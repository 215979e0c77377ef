//! Field geometry, tuning constants and side/slot vocabulary
//!
//! X is measured from the net, which sits on the field's vertical centerline.
//! Y grows downward; the ground plane is at `GROUND_PLANE_HEIGHT_MAX`.

use serde::{Deserialize, Serialize};

/// Number of body slots in a match (two per side)
pub const MAX_PLAYERS: usize = 4;

// Field borders
pub const LEFT_PLANE: f32 = -400.0;
pub const RIGHT_PLANE: f32 = 400.0;
pub const GROUND_PLANE_HEIGHT_MAX: f32 = 500.0;

// Body shape: two collision spheres offset from the body centre
pub const BODY_HEIGHT: f32 = 89.0;
pub const BODY_UPPER_SPHERE: f32 = 19.0;
pub const BODY_UPPER_RADIUS: f32 = 25.0;
pub const BODY_LOWER_SPHERE: f32 = 13.0;
pub const BODY_LOWER_RADIUS: f32 = 33.0;

/// Y coordinate of a body centre standing on the ground
pub const GROUND_PLANE_HEIGHT: f32 = GROUND_PLANE_HEIGHT_MAX - BODY_HEIGHT / 2.0;

// Ball
pub const BALL_RADIUS: f32 = 31.5;
pub const STANDARD_BALL_HEIGHT: f32 = 269.0 + BALL_RADIUS;
pub const STANDARD_BALL_ANGULAR_VELOCITY: f32 = 0.1;

// Net: a vertical stem with a circular cap at NET_SPHERE_POSITION
pub const NET_POSITION_X: f32 = 0.0;
pub const NET_RADIUS: f32 = 7.0;
pub const NET_SPHERE_POSITION: f32 = 284.0;

// Movement
pub const BODY_SPEED: f32 = 4.5;
pub const BODY_JUMP_VELOCITY: f32 = -15.1;
pub const BODY_ANIMATION_SPEED: f32 = 0.5;
pub const BODY_PUSH_VELOCITY: f32 = 2.5;
pub const GRAVITATION: f32 = 0.88;
pub const BODY_JUMP_BUFFER: f32 = 0.44;
pub const BALL_GRAVITATION: f32 = 0.28;

/// sqrt(0.75 * field width * BALL_GRAVITATION), precomputed so it stays a const
pub const BALL_COLLISION_VELOCITY: f32 = 12.961_481;

pub const HIT_INTENSITY_SCALE: f32 = 25.0;
pub const GROUND_DAMPING: f32 = 0.95;
pub const NET_NORMAL_DAMPING: f32 = 0.7;
pub const NET_TANGENT_DAMPING: f32 = 0.9;
pub const BALL_ROTATION_WRAP: f32 = 6.25;
pub const BALL_SPIN_DIVISOR: f32 = 6.0;

/// Landing faster than this restarts the squash animation
pub const BODY_LANDING_ANIMATION_SPEED: f32 = 3.5;

// Serve points
pub const LEFT_SERVE_X: f32 = -200.0;
pub const RIGHT_SERVE_X: f32 = 200.0;
pub const NEUTRAL_BALL_HEIGHT: f32 = 450.0;

/// One of the two competing groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Index into per-side arrays
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    /// The first body of this side; the one that serves
    pub fn primary_slot(self) -> PlayerSlot {
        match self {
            Side::Left => PlayerSlot::Left,
            Side::Right => PlayerSlot::Right,
        }
    }

    pub fn serve_x(self) -> f32 {
        match self {
            Side::Left => LEFT_SERVE_X,
            Side::Right => RIGHT_SERVE_X,
        }
    }

    /// Side of the field a horizontal position lies on
    pub fn of_x(x: f32) -> Self {
        if x > NET_POSITION_X {
            Side::Right
        } else {
            Side::Left
        }
    }
}

/// A body seat. Even slots play on the left side, odd slots on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PlayerSlot {
    Left = 0,
    Right = 1,
    Left2 = 2,
    Right2 = 3,
}

impl PlayerSlot {
    pub const ALL: [PlayerSlot; MAX_PLAYERS] = [
        PlayerSlot::Left,
        PlayerSlot::Right,
        PlayerSlot::Left2,
        PlayerSlot::Right2,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn side(self) -> Side {
        if self.index() % 2 == 0 {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// The slot sitting in the mirrored seat on the other side
    pub fn swapped(self) -> Self {
        match self {
            PlayerSlot::Left => PlayerSlot::Right,
            PlayerSlot::Right => PlayerSlot::Left,
            PlayerSlot::Left2 => PlayerSlot::Right2,
            PlayerSlot::Right2 => PlayerSlot::Left2,
        }
    }

    /// Name fragment used for per-slot replay variables
    pub fn prefix(self) -> &'static str {
        match self {
            PlayerSlot::Left => "left",
            PlayerSlot::Right => "right",
            PlayerSlot::Left2 => "left2",
            PlayerSlot::Right2 => "right2",
        }
    }

    /// Spawn position on the ground, mirrored between the two sides
    pub fn spawn_x(self) -> f32 {
        match self {
            PlayerSlot::Left => -200.0,
            PlayerSlot::Right => 200.0,
            PlayerSlot::Left2 => -280.0,
            PlayerSlot::Right2 => 280.0,
        }
    }

    /// Slots of one side, in slot order
    pub fn of_side(side: Side) -> impl Iterator<Item = PlayerSlot> {
        Self::ALL.into_iter().filter(move |slot| slot.side() == side)
    }
}
