//! Seeded bot occupying a seat through the same queue as a remote player

use tokio::sync::mpsc;
use tracing::debug;

use crate::game::field::PlayerSlot;
use crate::game::input::{InputSource, PlayerInput, RandomInput};
use crate::net::protocol::{ClientMsg, ServerMsg};

use super::registry::MatchHandle;

/// What a bot saw before leaving its seat
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BotReport {
    pub updates: u64,
    pub won: Option<bool>,
}

/// Play `slot` until the match is won or the channel closes.
/// A bot agrees to every unpause and leaves once the match is decided.
pub async fn run_bot(
    handle: MatchHandle,
    slot: PlayerSlot,
    mut outbound: mpsc::Receiver<ServerMsg>,
    seed: u64,
) -> BotReport {
    let mut source = RandomInput::new(seed);
    let mut report = BotReport::default();
    let mut time: u32 = 0;
    let mut own_side = slot.side();
    let mut last_input = PlayerInput::default();

    while let Some(msg) = outbound.recv().await {
        debug!(match_id = %handle.id, slot = ?slot, msg = ?msg, "Bot received");
        match msg {
            ServerMsg::MatchReady { slot: seen, .. } => {
                own_side = seen.side();
            }
            ServerMsg::GameUpdate { .. } => {
                report.updates += 1;
                let input = source.update_input();
                if input != last_input {
                    time = time.wrapping_add(1);
                    handle.send(slot, ClientMsg::InputUpdate { time, input });
                    last_input = input;
                }
            }
            ServerMsg::Paused => handle.send(slot, ClientMsg::Unpause),
            ServerMsg::Win { side } => {
                report.won = Some(side == own_side);
                handle.send(slot, ClientMsg::Disconnect);
                break;
            }
            _ => {}
        }
    }
    report
}
