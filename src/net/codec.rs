//! Compact little-endian encoding of match states, events and savepoints
//!
//! Every read checks the remaining length first, so a truncated buffer fails
//! with `CodecError::Truncated` instead of panicking.

use bytes::{Buf, BufMut, BytesMut};
use glam::Vec2;

use crate::game::events::{MatchEvent, MatchEventKind};
use crate::game::field::{PlayerSlot, Side, MAX_PLAYERS};
use crate::game::input::PlayerInput;
use crate::game::snapshot::{LogicState, MatchState, PhysicsState};
use crate::replay::ReplaySavePoint;

/// Encoded size of one `MatchState`
pub const MATCH_STATE_LEN: usize = PHYSICS_STATE_LEN + LOGIC_STATE_LEN + MAX_PLAYERS;
const PHYSICS_STATE_LEN: usize = MAX_PLAYERS * (6 * 4 + 1) + 6 * 4;
const LOGIC_STATE_LEN: usize = 4 * 4 + 2 + (MAX_PLAYERS + 2) * 4 + 2;
const EVENT_LEN: usize = 1 + 1 + 4;

/// Terminates an encoded event list
const END_OF_EVENTS: u8 = 0;
const NO_SLOT: u8 = 0xff;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Buffer truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("Invalid side byte: {0}")]
    InvalidSide(u8),

    #[error("Invalid event kind: {0}")]
    InvalidEventKind(u8),
}

pub(crate) fn ensure(buf: &impl Buf, needed: usize) -> Result<(), CodecError> {
    if buf.remaining() < needed {
        return Err(CodecError::Truncated {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

fn put_vec2(buf: &mut BytesMut, v: Vec2) {
    buf.put_f32_le(v.x);
    buf.put_f32_le(v.y);
}

fn get_vec2(buf: &mut impl Buf) -> Vec2 {
    let x = buf.get_f32_le();
    let y = buf.get_f32_le();
    Vec2::new(x, y)
}

fn put_side(buf: &mut BytesMut, side: Option<Side>) {
    buf.put_u8(match side {
        None => 0,
        Some(Side::Left) => 1,
        Some(Side::Right) => 2,
    });
}

fn get_side(buf: &mut impl Buf) -> Result<Option<Side>, CodecError> {
    match buf.get_u8() {
        0 => Ok(None),
        1 => Ok(Some(Side::Left)),
        2 => Ok(Some(Side::Right)),
        other => Err(CodecError::InvalidSide(other)),
    }
}

fn encode_physics_state(state: &PhysicsState, buf: &mut BytesMut) {
    for i in 0..MAX_PLAYERS {
        put_vec2(buf, state.body_position[i]);
        put_vec2(buf, state.body_velocity[i]);
        buf.put_f32_le(state.body_posture[i]);
        buf.put_f32_le(state.body_animation_speed[i]);
        buf.put_u8(state.enabled[i] as u8);
    }
    put_vec2(buf, state.ball_position);
    put_vec2(buf, state.ball_velocity);
    buf.put_f32_le(state.ball_rotation);
    buf.put_f32_le(state.ball_angular_velocity);
}

fn decode_physics_state(buf: &mut impl Buf) -> PhysicsState {
    let mut state = PhysicsState::default();
    for i in 0..MAX_PLAYERS {
        state.body_position[i] = get_vec2(buf);
        state.body_velocity[i] = get_vec2(buf);
        state.body_posture[i] = buf.get_f32_le();
        state.body_animation_speed[i] = buf.get_f32_le();
        state.enabled[i] = buf.get_u8() != 0;
    }
    state.ball_position = get_vec2(buf);
    state.ball_velocity = get_vec2(buf);
    state.ball_rotation = buf.get_f32_le();
    state.ball_angular_velocity = buf.get_f32_le();
    state
}

fn encode_logic_state(state: &LogicState, buf: &mut BytesMut) {
    buf.put_u32_le(state.left_score);
    buf.put_u32_le(state.right_score);
    buf.put_u32_le(state.hit_count[0]);
    buf.put_u32_le(state.hit_count[1]);
    put_side(buf, state.serving);
    put_side(buf, state.winning);
    for squish in state.squish {
        buf.put_u32_le(squish);
    }
    buf.put_u32_le(state.squish_wall);
    buf.put_u32_le(state.squish_ground);
    buf.put_u8(state.game_running as u8);
    buf.put_u8(state.ball_valid as u8);
}

fn decode_logic_state(buf: &mut impl Buf) -> Result<LogicState, CodecError> {
    let mut state = LogicState {
        left_score: buf.get_u32_le(),
        right_score: buf.get_u32_le(),
        hit_count: [buf.get_u32_le(), buf.get_u32_le()],
        serving: get_side(buf)?,
        winning: get_side(buf)?,
        ..LogicState::default()
    };
    for squish in state.squish.iter_mut() {
        *squish = buf.get_u32_le();
    }
    state.squish_wall = buf.get_u32_le();
    state.squish_ground = buf.get_u32_le();
    state.game_running = buf.get_u8() != 0;
    state.ball_valid = buf.get_u8() != 0;
    Ok(state)
}

pub fn encode_match_state(state: &MatchState, buf: &mut BytesMut) {
    buf.reserve(MATCH_STATE_LEN);
    encode_physics_state(&state.physics, buf);
    encode_logic_state(&state.logic, buf);
    for input in state.inputs {
        buf.put_u8(input.to_bits());
    }
}

pub fn decode_match_state(buf: &mut impl Buf) -> Result<MatchState, CodecError> {
    ensure(buf, MATCH_STATE_LEN)?;
    let physics = decode_physics_state(buf);
    let logic = decode_logic_state(buf)?;
    let mut inputs = [PlayerInput::default(); MAX_PLAYERS];
    for input in inputs.iter_mut() {
        *input = PlayerInput::from_bits(buf.get_u8());
    }

    Ok(MatchState {
        physics,
        logic,
        inputs,
    })
}

pub fn encode_event(event: &MatchEvent, buf: &mut BytesMut) {
    buf.put_u8(event.kind as u8);
    buf.put_u8(event.side.map_or(NO_SLOT, |slot| slot as u8));
    buf.put_f32_le(event.intensity);
}

pub fn decode_event(buf: &mut impl Buf) -> Result<MatchEvent, CodecError> {
    ensure(buf, EVENT_LEN)?;
    let raw_kind = buf.get_u8();
    let kind = MatchEventKind::from_u8(raw_kind).ok_or(CodecError::InvalidEventKind(raw_kind))?;
    let side = match buf.get_u8() {
        NO_SLOT => None,
        raw => Some(PlayerSlot::from_index(raw as usize).ok_or(CodecError::InvalidSide(raw))?),
    };

    Ok(MatchEvent {
        kind,
        side,
        intensity: buf.get_f32_le(),
    })
}

/// Events followed by a zero terminator byte
pub fn encode_events(events: &[MatchEvent], buf: &mut BytesMut) {
    buf.reserve(events.len() * EVENT_LEN + 1);
    for event in events {
        encode_event(event, buf);
    }
    buf.put_u8(END_OF_EVENTS);
}

pub fn decode_events(buf: &mut impl Buf) -> Result<Vec<MatchEvent>, CodecError> {
    let mut events = Vec::new();
    loop {
        ensure(buf, 1)?;
        if buf.chunk()[0] == END_OF_EVENTS {
            buf.advance(1);
            return Ok(events);
        }
        events.push(decode_event(buf)?);
    }
}

/// Count prefix followed by `(tick, state)` pairs
pub fn encode_save_points(points: &[ReplaySavePoint], buf: &mut BytesMut) {
    buf.reserve(4 + points.len() * (8 + MATCH_STATE_LEN));
    buf.put_u32_le(points.len() as u32);
    for point in points {
        buf.put_u64_le(point.tick);
        encode_match_state(&point.state, buf);
    }
}

pub fn decode_save_points(buf: &mut impl Buf) -> Result<Vec<ReplaySavePoint>, CodecError> {
    ensure(buf, 4)?;
    let count = buf.get_u32_le() as usize;
    // never trust the count for the allocation size
    ensure(buf, count.saturating_mul(8 + MATCH_STATE_LEN))?;

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let tick = buf.get_u64_le();
        let state = decode_match_state(buf)?;
        points.push(ReplaySavePoint { tick, state });
    }
    Ok(points)
}
