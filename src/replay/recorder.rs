//! Records a running match into a replay

use std::collections::BTreeMap;
use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    bytes_per_step, color_var, name_var, pack_inputs, ReplayError, ReplayFile,
    ReplaySavePoint, ReplayVersion, SAVEPOINT_PERIOD, VAR_GAME_DATE, VAR_GAME_DURATION, VAR_GAME_LENGTH,
    VAR_GAME_SPEED, VAR_SCORE_LEFT, VAR_SCORE_RIGHT,
};
use crate::game::field::{PlayerSlot, Side, MAX_PLAYERS};
use crate::game::input::PlayerInput;
use crate::game::rules::RulesDescriptor;
use crate::game::snapshot::MatchState;
use crate::net::codec::{decode_save_points, encode_save_points, ensure};
use crate::util::time::{ticks_to_seconds, unix_seconds};

pub struct ReplayRecorder {
    enabled: [bool; MAX_PLAYERS],
    names: [String; MAX_PLAYERS],
    colors: [u32; MAX_PLAYERS],
    game_speed: u32,
    rules: RulesDescriptor,
    date: i64,

    input: Vec<u8>,
    save_points: Vec<ReplaySavePoint>,
    ticks: u64,
    last_scores: Option<(u32, u32)>,
    last_enabled: [bool; MAX_PLAYERS],
    final_score: Option<(u32, u32)>,
}

impl ReplayRecorder {
    /// Start an empty recording. Enabled slots without a name are named
    /// after their seat, since an empty name marks a slot as unused.
    pub fn new(
        enabled: [bool; MAX_PLAYERS],
        names: [String; MAX_PLAYERS],
        colors: [u32; MAX_PLAYERS],
        game_speed: u32,
        rules: RulesDescriptor,
    ) -> Self {
        let names = std::array::from_fn(|i| match (enabled[i], names[i].is_empty()) {
            (false, _) => String::new(),
            (true, true) => PlayerSlot::ALL[i].prefix().to_string(),
            (true, false) => names[i].clone(),
        });

        Self {
            enabled,
            names,
            colors,
            game_speed,
            rules,
            date: unix_seconds(),
            input: Vec::new(),
            save_points: Vec::new(),
            ticks: 0,
            last_scores: None,
            last_enabled: enabled,
            final_score: None,
        }
    }

    /// Record one tick: `before` is the state the tick started from and
    /// `applied` the input physics consumed during it
    pub fn record(&mut self, before: &MatchState, applied: &[PlayerInput; MAX_PLAYERS]) {
        if self.final_score.is_some() {
            warn!("Ignoring tick recorded after finalize");
            return;
        }

        let scores = (before.logic.left_score, before.logic.right_score);
        let periodic = self.ticks % SAVEPOINT_PERIOD == 0;
        // a slot leaving changes the simulation without showing up in the input log
        let roster_changed = before.physics.enabled != self.last_enabled;
        if periodic || self.last_scores != Some(scores) || roster_changed {
            self.save_points.push(ReplaySavePoint {
                tick: self.ticks,
                state: *before,
            });
        }
        self.last_scores = Some(scores);
        self.last_enabled = before.physics.enabled;

        pack_inputs(&self.enabled, applied, &mut self.input);
        self.ticks += 1;
    }

    /// Close the recording with one second of idle input
    pub fn finalize(&mut self, left_score: u32, right_score: u32) {
        if self.final_score.is_some() {
            return;
        }
        let padding = bytes_per_step(&self.enabled) * self.game_speed as usize;
        self.input.resize(self.input.len() + padding, 0);
        self.ticks += self.game_speed as u64;
        self.final_score = Some((left_score, right_score));
        debug!(ticks = self.ticks, left_score, right_score, "Replay finalized");
    }

    pub fn is_finalized(&self) -> bool {
        self.final_score.is_some()
    }

    /// Ticks recorded so far, padding included
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn save_points(&self) -> &[ReplaySavePoint] {
        &self.save_points
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    pub fn rules(&self) -> &RulesDescriptor {
        &self.rules
    }

    pub fn game_speed(&self) -> u32 {
        self.game_speed
    }

    pub fn name(&self, slot: PlayerSlot) -> &str {
        &self.names[slot.index()]
    }

    /// Final score if finalized, else the score at the last recorded tick
    pub fn score(&self, side: Side) -> u32 {
        let (left, right) = self.final_score.or(self.last_scores).unwrap_or((0, 0));
        match side {
            Side::Left => left,
            Side::Right => right,
        }
    }

    fn vars(&self) -> BTreeMap<String, Value> {
        let mut vars = BTreeMap::new();
        vars.insert(VAR_GAME_SPEED.to_string(), Value::from(self.game_speed));
        vars.insert(VAR_GAME_LENGTH.to_string(), Value::from(self.ticks));
        vars.insert(
            VAR_GAME_DURATION.to_string(),
            Value::from(ticks_to_seconds(self.ticks, self.game_speed)),
        );
        vars.insert(VAR_GAME_DATE.to_string(), Value::from(self.date));
        vars.insert(VAR_SCORE_LEFT.to_string(), Value::from(self.score(Side::Left)));
        vars.insert(VAR_SCORE_RIGHT.to_string(), Value::from(self.score(Side::Right)));

        for slot in PlayerSlot::ALL {
            if self.enabled[slot.index()] {
                vars.insert(name_var(slot), Value::from(self.names[slot.index()].clone()));
                vars.insert(color_var(slot), Value::from(self.colors[slot.index()]));
            }
        }
        vars
    }

    /// Write the replay file envelope
    pub fn save<W: Write>(&self, writer: W) -> Result<(), ReplayError> {
        let mut states = BytesMut::new();
        encode_save_points(&self.save_points, &mut states);

        let file = ReplayFile {
            version: Some(ReplayVersion::CURRENT),
            vars: Some(self.vars()),
            rules: Some(self.rules.to_json()?),
            input: Some(BASE64.encode(&self.input)),
            states: Some(BASE64.encode(&states)),
        };
        serde_json::to_writer_pretty(writer, &file)?;
        Ok(())
    }

    /// Compact binary form of the whole recording, for sending to a client
    pub fn to_bytes(&self) -> Result<Bytes, ReplayError> {
        let mut buf = BytesMut::new();
        buf.put_u32_le(self.game_speed);
        buf.put_i64_le(self.date);
        buf.put_u8(self.final_score.is_some() as u8);
        buf.put_u32_le(self.score(Side::Left));
        buf.put_u32_le(self.score(Side::Right));
        put_string(&mut buf, &self.rules.to_json()?);
        for slot in PlayerSlot::ALL {
            put_string(&mut buf, &self.names[slot.index()]);
            buf.put_u32_le(self.colors[slot.index()]);
        }
        buf.put_u64_le(self.ticks);
        buf.put_u32_le(self.input.len() as u32);
        buf.put_slice(&self.input);
        encode_save_points(&self.save_points, &mut buf);
        Ok(buf.freeze())
    }

    pub fn from_bytes(mut buf: impl Buf) -> Result<Self, ReplayError> {
        ensure(&buf, 4 + 8 + 1 + 4 + 4)?;
        let game_speed = buf.get_u32_le();
        let date = buf.get_i64_le();
        let finalized = buf.get_u8() != 0;
        let scores = (buf.get_u32_le(), buf.get_u32_le());
        let rules = RulesDescriptor::from_json(&get_string(&mut buf)?)?;

        let mut names: [String; MAX_PLAYERS] = Default::default();
        let mut colors = [0u32; MAX_PLAYERS];
        for i in 0..MAX_PLAYERS {
            names[i] = get_string(&mut buf)?;
            ensure(&buf, 4)?;
            colors[i] = buf.get_u32_le();
        }
        let enabled = std::array::from_fn(|i| !names[i].is_empty());
        if enabled == [false; MAX_PLAYERS] {
            return Err(ReplayError::NoPlayers);
        }

        ensure(&buf, 8 + 4)?;
        let ticks = buf.get_u64_le();
        let input_len = buf.get_u32_le() as usize;
        ensure(&buf, input_len)?;
        let input = buf.copy_to_bytes(input_len).to_vec();

        let expected = super::input_len(&enabled, ticks)?;
        if input.len() != expected {
            return Err(ReplayError::InputLengthMismatch {
                expected,
                actual: input.len(),
            });
        }
        let save_points = decode_save_points(&mut buf)?;

        Ok(Self {
            enabled,
            names,
            colors,
            game_speed,
            rules,
            date,
            input,
            last_enabled: save_points
                .last()
                .map_or(enabled, |point| point.state.physics.enabled),
            save_points,
            ticks,
            last_scores: Some(scores),
            final_score: finalized.then_some(scores),
        })
    }
}

fn put_string(buf: &mut BytesMut, value: &str) {
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

fn get_string(buf: &mut impl Buf) -> Result<String, ReplayError> {
    ensure(buf, 4)?;
    let len = buf.get_u32_le() as usize;
    ensure(buf, len)?;
    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec()).map_err(|err| ReplayError::InvalidField {
        name: "string".to_string(),
        value: err.to_string(),
    })
}
