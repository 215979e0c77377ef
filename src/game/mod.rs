//! Deterministic match simulation

pub mod events;
pub mod field;
pub mod input;
pub mod r#match;
pub mod physics;
pub mod rules;
pub mod snapshot;

pub use events::{MatchEvent, MatchEventKind};
pub use field::{PlayerSlot, Side, MAX_PLAYERS};
pub use input::{BufferedInput, InputSource, PlayerInput, RandomInput};
pub use physics::PhysicsWorld;
pub use r#match::{GameMatch, MatchMode};
pub use rules::{create_rules, GameRules, RulesDescriptor, RulesError};
pub use snapshot::{LogicState, MatchState, PhysicsState};
