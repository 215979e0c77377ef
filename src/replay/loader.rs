//! Reads replay files and answers random-access queries about them

use std::collections::BTreeMap;
use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use tracing::debug;

use super::{
    bytes_per_step, color_var, input_len, name_var, unpack_inputs, ReplayError, ReplayFile,
    ReplayRecorder, ReplaySavePoint, ReplayVersion, REPLAY_FILE_VERSION_MAJOR,
    SAVEPOINT_PERIOD, VAR_GAME_DATE, VAR_GAME_DURATION, VAR_GAME_LENGTH, VAR_GAME_SPEED,
    VAR_SCORE_LEFT, VAR_SCORE_RIGHT,
};
use crate::game::field::{PlayerSlot, Side, MAX_PLAYERS};
use crate::game::input::PlayerInput;
use crate::game::rules::RulesDescriptor;
use crate::net::codec::decode_save_points;

#[derive(Debug, Clone)]
pub struct ReplayLoader {
    version: ReplayVersion,
    game_speed: u32,
    game_length: u64,
    game_duration: u64,
    game_date: i64,
    scores: [u32; 2],
    names: [String; MAX_PLAYERS],
    colors: [u32; MAX_PLAYERS],
    enabled: [bool; MAX_PLAYERS],
    rules: RulesDescriptor,
    input: Vec<u8>,
    save_points: Vec<ReplaySavePoint>,
}

impl ReplayLoader {
    pub fn load<R: Read>(reader: R) -> Result<Self, ReplayError> {
        let file: ReplayFile = serde_json::from_reader(reader)?;

        let version = file.version.ok_or(ReplayError::MissingField("version"))?;
        if version.major != REPLAY_FILE_VERSION_MAJOR {
            return Err(ReplayError::VersionMismatch {
                major: version.major,
                minor: version.minor,
            });
        }

        let vars = file.vars.ok_or(ReplayError::MissingField("vars"))?;
        let rules = RulesDescriptor::from_json(
            &file.rules.ok_or(ReplayError::MissingField("rules"))?,
        )?;
        let input = BASE64.decode(file.input.ok_or(ReplayError::MissingField("input"))?)?;
        let states = BASE64.decode(file.states.ok_or(ReplayError::MissingField("states"))?)?;

        let mut names: [String; MAX_PLAYERS] = Default::default();
        let mut colors = [0u32; MAX_PLAYERS];
        for slot in PlayerSlot::ALL {
            if let Some(name) = vars.get(&name_var(slot)) {
                names[slot.index()] = text_var(&name_var(slot), name)?;
                colors[slot.index()] = match vars.get(&color_var(slot)) {
                    Some(color) => int_var(&color_var(slot), color)?,
                    None => 0,
                };
            }
        }
        let enabled: [bool; MAX_PLAYERS] = std::array::from_fn(|i| !names[i].is_empty());
        if !enabled.contains(&true) {
            return Err(ReplayError::NoPlayers);
        }

        let game_length: u64 = required_int(&vars, VAR_GAME_LENGTH)?;
        let expected = input_len(&enabled, game_length)?;
        if input.len() != expected {
            return Err(ReplayError::InputLengthMismatch {
                expected,
                actual: input.len(),
            });
        }

        let save_points = decode_save_points(&mut states.as_slice())?;
        if save_points.is_empty() {
            return Err(ReplayError::InvalidField {
                name: "states".to_string(),
                value: "no savepoints".to_string(),
            });
        }

        let loader = Self {
            version,
            game_speed: required_int(&vars, VAR_GAME_SPEED)?,
            game_length,
            game_duration: required_int(&vars, VAR_GAME_DURATION)?,
            game_date: required_int(&vars, VAR_GAME_DATE)?,
            scores: [
                required_int(&vars, VAR_SCORE_LEFT)?,
                required_int(&vars, VAR_SCORE_RIGHT)?,
            ],
            names,
            colors,
            enabled,
            rules,
            input,
            save_points,
        };
        debug!(
            length = loader.game_length,
            save_points = loader.save_points.len(),
            rules = %loader.rules.name,
            "Replay loaded"
        );
        Ok(loader)
    }

    /// Load a recording that was kept in memory
    pub fn from_recorder(recorder: &ReplayRecorder) -> Result<Self, ReplayError> {
        let mut file = Vec::new();
        recorder.save(&mut file)?;
        Self::load(file.as_slice())
    }

    pub fn version(&self) -> ReplayVersion {
        self.version
    }

    pub fn game_speed(&self) -> u32 {
        self.game_speed
    }

    /// Length in ticks, padding included
    pub fn length(&self) -> u64 {
        self.game_length
    }

    /// Length in seconds
    pub fn duration(&self) -> u64 {
        self.game_duration
    }

    /// Unix seconds when the match was recorded
    pub fn date(&self) -> i64 {
        self.game_date
    }

    pub fn final_score(&self, side: Side) -> u32 {
        self.scores[side.index()]
    }

    pub fn name(&self, slot: PlayerSlot) -> &str {
        &self.names[slot.index()]
    }

    pub fn color(&self, slot: PlayerSlot) -> u32 {
        self.colors[slot.index()]
    }

    pub fn enabled_slots(&self) -> [bool; MAX_PLAYERS] {
        self.enabled
    }

    pub fn rules(&self) -> &RulesDescriptor {
        &self.rules
    }

    pub fn bytes_per_step(&self) -> usize {
        bytes_per_step(&self.enabled)
    }

    /// Inputs of every slot at `tick`
    pub fn input_at(&self, tick: u64) -> Result<[PlayerInput; MAX_PLAYERS], ReplayError> {
        if tick >= self.game_length {
            return Err(ReplayError::TickOutOfRange(tick));
        }
        let width = self.bytes_per_step();
        let start = tick as usize * width;
        Ok(unpack_inputs(&self.enabled, &self.input[start..start + width]))
    }

    pub fn save_point_count(&self) -> usize {
        self.save_points.len()
    }

    /// Index of the latest savepoint at or before `target`
    pub fn save_point_index(&self, target: u64) -> usize {
        let last = self.save_points.len().saturating_sub(1);
        let mut index = ((target / SAVEPOINT_PERIOD) as usize).min(last);

        while index > 0 && self.save_points[index].tick > target {
            index -= 1;
        }
        while index < last && self.save_points[index + 1].tick <= target {
            index += 1;
        }
        index
    }

    /// Latest savepoint at or before `target`
    pub fn save_point(&self, target: u64) -> &ReplaySavePoint {
        &self.save_points[self.save_point_index(target)]
    }

    pub fn is_save_point(&self, tick: u64) -> bool {
        self.save_points
            .binary_search_by_key(&tick, |point| point.tick)
            .is_ok()
    }

    pub fn read_save_point(&self, index: usize) -> Option<&ReplaySavePoint> {
        self.save_points.get(index)
    }
}

fn required_int<T: TryFrom<i64>>(
    vars: &BTreeMap<String, Value>,
    name: &'static str,
) -> Result<T, ReplayError> {
    let value = vars.get(name).ok_or(ReplayError::MissingField(name))?;
    int_var(name, value)
}

fn int_var<T: TryFrom<i64>>(name: &str, value: &Value) -> Result<T, ReplayError> {
    value
        .as_i64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| ReplayError::InvalidField {
            name: name.to_string(),
            value: value.to_string(),
        })
}

fn text_var(name: &str, value: &Value) -> Result<String, ReplayError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ReplayError::InvalidField {
            name: name.to_string(),
            value: value.to_string(),
        })
}
