//! Match hosting: one worker task per match behind an inbound queue

pub mod bot;
pub mod game;
pub mod registry;

pub use bot::{run_bot, BotReport};
pub use game::{HostError, InboundQueue, MatchConfig, NetworkGame, SeatConfig, SeatReceivers};
pub use registry::{HostedMatch, MatchHandle, MatchHost, MatchRegistry};
