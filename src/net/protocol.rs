//! Message definitions exchanged between a hosted match and its seats
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::events::MatchEvent;
use crate::game::field::{PlayerSlot, Side};
use crate::game::input::PlayerInput;
use crate::game::snapshot::MatchState;

/// Messages sent from a seat to the match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Input held by the player
    InputUpdate {
        /// Client timestamp, echoed back in the next game update
        time: u32,
        input: PlayerInput,
    },

    Pause,

    /// Ready to continue; the match resumes once every seat sent this
    Unpause,

    Chat {
        message: String,
    },

    /// Ask for the recording of the match so far
    RequestReplay,

    /// Seat is leaving the match
    Disconnect,
}

/// Messages sent from the match to a seat
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Match created; sent once to every seat before the first update
    MatchReady {
        match_id: Uuid,
        /// Slot as seen by the receiver
        slot: PlayerSlot,
        seats: Vec<SeatInfo>,
        rules_name: String,
        /// SHA-256 of the rules descriptor, hex encoded
        rules_checksum: String,
        score_to_win: u32,
        game_speed: u32,
    },

    /// Authoritative state after a tick
    GameUpdate {
        last_input_time: u32,
        state: MatchState,
    },

    /// Events of the last tick, sent as base64 of the binary event list
    GameEvents {
        #[serde(with = "event_bytes")]
        events: Vec<MatchEvent>,
    },

    Paused,

    Unpaused,

    Chat {
        from: PlayerSlot,
        message: String,
    },

    OpponentDisconnected {
        slot: PlayerSlot,
    },

    Win {
        side: Side,
    },

    Replay {
        /// Base64 encoded recording, see `ReplayRecorder::to_bytes`
        data: String,
    },

    /// A request from this seat was rejected
    Error {
        code: String,
        message: String,
    },
}

/// Seat info for match announcements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub slot: PlayerSlot,
    pub name: String,
    /// Body color as 0xRRGGBB
    pub color: u32,
}

impl ServerMsg {
    /// The same message as seen from the mirrored seat
    pub fn mirrored(self) -> Self {
        match self {
            ServerMsg::MatchReady {
                match_id,
                slot,
                seats,
                rules_name,
                rules_checksum,
                score_to_win,
                game_speed,
            } => ServerMsg::MatchReady {
                match_id,
                slot: slot.swapped(),
                seats: seats
                    .into_iter()
                    .map(|seat| SeatInfo {
                        slot: seat.slot.swapped(),
                        ..seat
                    })
                    .collect(),
                rules_name,
                rules_checksum,
                score_to_win,
                game_speed,
            },
            ServerMsg::GameUpdate {
                last_input_time,
                state,
            } => ServerMsg::GameUpdate {
                last_input_time,
                state: state.mirror(),
            },
            ServerMsg::GameEvents { events } => ServerMsg::GameEvents {
                events: events.iter().map(MatchEvent::mirrored).collect(),
            },
            ServerMsg::Chat { from, message } => ServerMsg::Chat {
                from: from.swapped(),
                message,
            },
            ServerMsg::OpponentDisconnected { slot } => ServerMsg::OpponentDisconnected {
                slot: slot.swapped(),
            },
            ServerMsg::Win { side } => ServerMsg::Win {
                side: side.opposite(),
            },
            other => other,
        }
    }
}

mod event_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use bytes::BytesMut;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::game::events::MatchEvent;
    use crate::net::codec::{decode_events, encode_events};

    pub fn serialize<S: Serializer>(events: &[MatchEvent], serializer: S) -> Result<S::Ok, S::Error> {
        let mut buf = BytesMut::new();
        encode_events(events, &mut buf);
        serializer.serialize_str(&BASE64.encode(&buf))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<MatchEvent>, D::Error> {
        let text = String::deserialize(deserializer)?;
        let raw = BASE64.decode(text).map_err(D::Error::custom)?;
        decode_events(&mut raw.as_slice()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::MatchEventKind;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    #[test]
    fn client_messages_use_tagged_json() {
        let msg = ClientMsg::InputUpdate {
            time: 12,
            input: PlayerInput::new(true, false, true),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "input_update");
        assert_eq!(json["input"]["jump"], true);

        let parsed: ClientMsg = serde_json::from_str(r#"{"type":"unpause"}"#).unwrap();
        assert!(matches!(parsed, ClientMsg::Unpause));
    }

    #[test]
    fn events_travel_in_binary_form() {
        let events = vec![
            MatchEvent::body_hit(PlayerSlot::Right2, 0.75),
            MatchEvent::new(MatchEventKind::RoundReset, None),
        ];
        let json = serde_json::to_value(ServerMsg::GameEvents {
            events: events.clone(),
        })
        .unwrap();
        assert_eq!(json["type"], "game_events");
        // two 6 byte events and the terminator
        let text = json["events"].as_str().unwrap();
        assert_eq!(BASE64.decode(text).unwrap().len(), 13);

        match serde_json::from_value::<ServerMsg>(json).unwrap() {
            ServerMsg::GameEvents { events: parsed } => assert_eq!(parsed, events),
            other => panic!("unexpected message {other:?}"),
        }

        let garbage = r#"{"type":"game_events","events":"/w=="}"#;
        assert!(serde_json::from_str::<ServerMsg>(garbage).is_err());
    }

    #[test]
    fn mirrored_messages_swap_sides() {
        let win = ServerMsg::Win { side: Side::Left }.mirrored();
        assert!(matches!(win, ServerMsg::Win { side: Side::Right }));

        let events = ServerMsg::GameEvents {
            events: vec![MatchEvent::for_side(MatchEventKind::BallHitWall, Side::Right)],
        }
        .mirrored();
        match events {
            ServerMsg::GameEvents { events } => {
                assert_eq!(events[0].side, Some(PlayerSlot::Left));
            }
            other => panic!("unexpected message {other:?}"),
        }

        let mut state = MatchState::default();
        state.logic.left_score = 4;
        let update = ServerMsg::GameUpdate {
            last_input_time: 3,
            state,
        }
        .mirrored();
        match update {
            ServerMsg::GameUpdate { state, .. } => assert_eq!(state.logic.right_score, 4),
            other => panic!("unexpected message {other:?}"),
        }
    }
}
