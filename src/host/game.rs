//! A hosted match: the authoritative tick loop behind a set of seats

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::field::{PlayerSlot, Side, MAX_PLAYERS};
use crate::game::r#match::{GameMatch, MatchMode};
use crate::game::rules::{create_rules, RulesError};
use crate::net::protocol::{ClientMsg, SeatInfo, ServerMsg};
use crate::replay::ReplayRecorder;
use crate::util::rate_limit::ChatRateLimiter;
use crate::util::time::tick_duration;

/// Outbound messages buffered per seat before new ones are dropped
pub const OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),

    #[error("Slot {0:?} is assigned twice")]
    DuplicateSeat(PlayerSlot),

    #[error("Side {0:?} has no players")]
    EmptySide(Side),
}

/// One participant of a hosted match
#[derive(Debug, Clone)]
pub struct SeatConfig {
    pub slot: PlayerSlot,
    pub name: String,
    /// Body color as 0xRRGGBB
    pub color: u32,
    /// The seat sees the field mirrored, playing from the left
    pub switched_side: bool,
}

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub game_speed: u32,
    pub rules: String,
    pub score_to_win: u32,
    pub chat_rate_limit: u32,
    pub seats: Vec<SeatConfig>,
}

/// Messages waiting for the next tick, shared between handles and the worker
#[derive(Clone, Default)]
pub struct InboundQueue {
    inner: Arc<Mutex<VecDeque<(PlayerSlot, ClientMsg)>>>,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, slot: PlayerSlot, msg: ClientMsg) {
        self.inner.lock().push_back((slot, msg));
    }

    /// Take everything queued so far
    pub fn drain(&self) -> Vec<(PlayerSlot, ClientMsg)> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

struct Seat {
    config: SeatConfig,
    outbound: mpsc::Sender<ServerMsg>,
    chat: ChatRateLimiter,
    last_input_time: u32,
    /// Agreed to continue after a pause
    ready: bool,
    connected: bool,
}

/// Receiving end of every seat's outbound channel
pub type SeatReceivers = Vec<(PlayerSlot, mpsc::Receiver<ServerMsg>)>;

/// The authoritative match worker
pub struct NetworkGame {
    id: Uuid,
    game: GameMatch,
    recorder: ReplayRecorder,
    seats: [Option<Seat>; MAX_PLAYERS],
    inbound: InboundQueue,
    stop: Arc<AtomicBool>,
    game_speed: u32,
    valid: bool,
    finished: bool,
}

impl NetworkGame {
    pub fn new(
        id: Uuid,
        config: MatchConfig,
        inbound: InboundQueue,
        stop: Arc<AtomicBool>,
    ) -> Result<(Self, SeatReceivers), HostError> {
        let mut seats: [Option<Seat>; MAX_PLAYERS] = std::array::from_fn(|_| None);
        let mut receivers = Vec::with_capacity(config.seats.len());

        for seat in config.seats {
            let slot = seat.slot;
            if seats[slot.index()].is_some() {
                return Err(HostError::DuplicateSeat(slot));
            }
            let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
            receivers.push((slot, rx));
            seats[slot.index()] = Some(Seat {
                config: seat,
                outbound: tx,
                chat: ChatRateLimiter::new(config.chat_rate_limit),
                last_input_time: 0,
                ready: true,
                connected: true,
            });
        }

        let enabled: [bool; MAX_PLAYERS] = std::array::from_fn(|i| seats[i].is_some());
        for side in Side::BOTH {
            if !PlayerSlot::of_side(side).any(|slot| enabled[slot.index()]) {
                return Err(HostError::EmptySide(side));
            }
        }

        let rules = create_rules(&config.rules, config.score_to_win)?;
        let game = GameMatch::new(MatchMode::Local, rules, enabled);

        let names = std::array::from_fn(|i| {
            seats[i]
                .as_ref()
                .map(|seat| seat.config.name.clone())
                .unwrap_or_default()
        });
        let colors = std::array::from_fn(|i| seats[i].as_ref().map_or(0, |seat| seat.config.color));
        let recorder = ReplayRecorder::new(
            enabled,
            names,
            colors,
            config.game_speed,
            game.rules_descriptor().clone(),
        );

        let network_game = Self {
            id,
            game,
            recorder,
            seats,
            inbound,
            stop,
            game_speed: config.game_speed,
            valid: true,
            finished: false,
        };
        Ok((network_game, receivers))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Still has players on both sides
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn game(&self) -> &GameMatch {
        &self.game
    }

    #[cfg(test)]
    pub(crate) fn game_mut(&mut self) -> &mut GameMatch {
        &mut self.game
    }

    pub fn recorder(&self) -> &ReplayRecorder {
        &self.recorder
    }

    /// Run the authoritative tick loop until stopped or a side is empty.
    /// Returns the finalized recording.
    pub async fn run(mut self) -> ReplayRecorder {
        info!(match_id = %self.id, game_speed = self.game_speed, "Match started");
        self.announce();

        let mut tick_interval = interval(tick_duration(self.game_speed));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            if self.stop.load(Ordering::Relaxed) {
                info!(match_id = %self.id, "Stop requested, ending match");
                break;
            }

            self.tick();

            if !self.valid {
                info!(match_id = %self.id, "A side has no players left, ending match");
                break;
            }
        }

        if !self.recorder.is_finalized() {
            self.recorder
                .finalize(self.game.score(Side::Left), self.game.score(Side::Right));
        }
        info!(
            match_id = %self.id,
            ticks = self.recorder.ticks(),
            left_score = self.game.score(Side::Left),
            right_score = self.game.score(Side::Right),
            "Match ended"
        );
        self.recorder
    }

    /// Process queued messages, then advance the simulation by one tick
    pub fn tick(&mut self) {
        for (slot, msg) in self.inbound.drain() {
            self.handle_message(slot, msg);
        }
        if !self.valid {
            return;
        }

        if !self.game.is_paused() {
            let before = self.game.state();
            self.game.step();
            self.recorder.record(&before, &self.game.applied_inputs());

            let events = self.game.last_events().to_vec();
            if !events.is_empty() {
                self.broadcast(ServerMsg::GameEvents { events });
            }

            let state = self.game.state();
            for slot in PlayerSlot::ALL {
                let Some(last_input_time) = self.connected_seat(slot).map(|s| s.last_input_time)
                else {
                    continue;
                };
                self.send_to(
                    slot,
                    ServerMsg::GameUpdate {
                        last_input_time,
                        state,
                    },
                );
            }
        }

        self.check_win();
    }

    fn handle_message(&mut self, slot: PlayerSlot, msg: ClientMsg) {
        if self.connected_seat(slot).is_none() {
            warn!(match_id = %self.id, slot = ?slot, "Message for an empty seat dropped");
            return;
        }

        match msg {
            ClientMsg::InputUpdate { time, input } => {
                let switched = self.seat_switched(slot);
                let input = if switched { input.swap_sides() } else { input };
                self.game.input_source_mut(slot).set_input(input);
                if let Some(seat) = self.seats[slot.index()].as_mut() {
                    seat.last_input_time = time;
                }
            }
            ClientMsg::Pause => self.pause(slot),
            ClientMsg::Unpause => self.unpause(slot),
            ClientMsg::Chat { message } => self.chat(slot, message),
            ClientMsg::RequestReplay => self.send_replay(slot),
            ClientMsg::Disconnect => self.disconnect(slot),
        }
    }

    fn pause(&mut self, slot: PlayerSlot) {
        if self.game.is_paused() {
            return;
        }
        debug!(match_id = %self.id, slot = ?slot, "Match paused");
        self.game.pause();
        for seat in self.seats.iter_mut().flatten() {
            seat.ready = false;
        }
        self.broadcast(ServerMsg::Paused);
    }

    /// The match resumes once every connected seat agreed
    fn unpause(&mut self, slot: PlayerSlot) {
        if self.finished {
            self.reject(slot, "match_finished", "The match is already decided");
            return;
        }
        if !self.game.is_paused() {
            return;
        }
        if let Some(seat) = self.seats[slot.index()].as_mut() {
            seat.ready = true;
        }

        let all_ready = self
            .seats
            .iter()
            .flatten()
            .filter(|seat| seat.connected)
            .all(|seat| seat.ready);
        if all_ready {
            debug!(match_id = %self.id, "Match resumed");
            self.game.unpause();
            self.broadcast(ServerMsg::Unpaused);
        }
    }

    fn chat(&mut self, from: PlayerSlot, message: String) {
        let allowed = self
            .connected_seat(from)
            .map_or(false, |seat| seat.chat.check());
        if !allowed {
            debug!(match_id = %self.id, slot = ?from, "Chat message over quota dropped");
            self.reject(from, "chat_rate_limited", "Too many chat messages");
            return;
        }

        for slot in PlayerSlot::ALL {
            if slot != from && self.connected_seat(slot).is_some() {
                self.send_to(
                    slot,
                    ServerMsg::Chat {
                        from,
                        message: message.clone(),
                    },
                );
            }
        }
    }

    fn send_replay(&mut self, slot: PlayerSlot) {
        match self.recorder.to_bytes() {
            Ok(bytes) => self.send_to(
                slot,
                ServerMsg::Replay {
                    data: BASE64.encode(&bytes),
                },
            ),
            Err(err) => {
                warn!(match_id = %self.id, error = %err, "Failed to encode replay");
                self.reject(slot, "replay_unavailable", "The recording could not be encoded");
            }
        }
    }

    fn reject(&self, slot: PlayerSlot, code: &str, message: &str) {
        self.send_to(
            slot,
            ServerMsg::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }

    fn disconnect(&mut self, slot: PlayerSlot) {
        let Some(seat) = self.seats[slot.index()].as_mut() else {
            return;
        };
        if !seat.connected {
            return;
        }
        seat.connected = false;
        info!(match_id = %self.id, slot = ?slot, name = %seat.config.name, "Player disconnected");

        self.game.set_player_enabled(slot, false);
        if !self.finished {
            self.pause(slot);
        }
        self.broadcast(ServerMsg::OpponentDisconnected { slot });

        if self.game.players_in_team(slot.side()) == 0 {
            self.valid = false;
        }
    }

    fn check_win(&mut self) {
        if self.finished {
            return;
        }
        let Some(side) = self.game.winning_side() else {
            return;
        };

        self.finished = true;
        let (left, right) = (self.game.score(Side::Left), self.game.score(Side::Right));
        info!(match_id = %self.id, winner = ?side, left_score = left, right_score = right, "Match won");

        self.game.pause();
        self.recorder.finalize(left, right);
        self.broadcast(ServerMsg::Win { side });
    }

    /// Send the opening message with the match setup to every seat
    fn announce(&self) {
        let seats: Vec<SeatInfo> = self
            .seats
            .iter()
            .flatten()
            .map(|seat| SeatInfo {
                slot: seat.config.slot,
                name: seat.config.name.clone(),
                color: seat.config.color,
            })
            .collect();
        let descriptor = self.game.rules_descriptor();

        for slot in PlayerSlot::ALL {
            if self.connected_seat(slot).is_none() {
                continue;
            }
            self.send_to(
                slot,
                ServerMsg::MatchReady {
                    match_id: self.id,
                    slot,
                    seats: seats.clone(),
                    rules_name: descriptor.name.clone(),
                    rules_checksum: descriptor.checksum(),
                    score_to_win: descriptor.score_to_win,
                    game_speed: self.game_speed,
                },
            );
        }
    }

    fn connected_seat(&self, slot: PlayerSlot) -> Option<&Seat> {
        self.seats[slot.index()].as_ref().filter(|seat| seat.connected)
    }

    fn seat_switched(&self, slot: PlayerSlot) -> bool {
        self.seats[slot.index()]
            .as_ref()
            .map_or(false, |seat| seat.config.switched_side)
    }

    fn broadcast(&self, msg: ServerMsg) {
        for slot in PlayerSlot::ALL {
            if self.connected_seat(slot).is_some() {
                self.send_to(slot, msg.clone());
            }
        }
    }

    /// Deliver without blocking the tick; switched seats get the mirrored view
    fn send_to(&self, slot: PlayerSlot, msg: ServerMsg) {
        let Some(seat) = self.connected_seat(slot) else {
            return;
        };
        let msg = if seat.config.switched_side {
            msg.mirrored()
        } else {
            msg
        };

        match seat.outbound.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(match_id = %self.id, slot = ?slot, "Outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(match_id = %self.id, slot = ?slot, "Seat receiver closed");
            }
        }
    }
}
