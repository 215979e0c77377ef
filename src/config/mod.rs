//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::rules::{CLASSIC_RULES, DEFAULT_SCORE_TO_WIN, DUMMY_RULES};
use crate::util::rate_limit::CHAT_RATE_LIMIT;
use crate::util::time::DEFAULT_GAME_SPEED;

/// Players per team supported by the field
pub const MAX_PLAYERS_PER_TEAM: usize = 2;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Ticks per second
    pub game_speed: u32,
    pub score_to_win: u32,
    /// Rules name, "classic" or "dummy"
    pub rules: String,
    /// Directory finished recordings are written to
    pub replay_dir: PathBuf,

    /// Bot matches started by the server binary
    pub demo_matches: usize,
    pub players_per_team: usize,
    /// Seed for the bots; random when unset
    pub match_seed: Option<u64>,
    /// Chat messages per second per seat
    pub chat_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let rules = env::var("RULES").unwrap_or_else(|_| CLASSIC_RULES.to_string());
        if !matches!(rules.as_str(), CLASSIC_RULES | DUMMY_RULES | "default") {
            return Err(ConfigError::Invalid {
                var: "RULES",
                value: rules,
            });
        }

        let players_per_team = parse_var("PLAYERS_PER_TEAM", 1usize)?;
        if players_per_team == 0 || players_per_team > MAX_PLAYERS_PER_TEAM {
            return Err(ConfigError::Invalid {
                var: "PLAYERS_PER_TEAM",
                value: players_per_team.to_string(),
            });
        }

        let game_speed = parse_var("GAME_SPEED", DEFAULT_GAME_SPEED)?;
        if game_speed == 0 {
            return Err(ConfigError::Invalid {
                var: "GAME_SPEED",
                value: game_speed.to_string(),
            });
        }

        let match_seed = match env::var("MATCH_SEED") {
            Ok(value) => Some(value.parse().map_err(|_| ConfigError::Invalid {
                var: "MATCH_SEED",
                value,
            })?),
            Err(_) => None,
        };

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            game_speed,
            score_to_win: parse_var("SCORE_TO_WIN", DEFAULT_SCORE_TO_WIN)?,
            rules,
            replay_dir: env::var("REPLAY_DIR")
                .unwrap_or_else(|_| "replays".to_string())
                .into(),
            demo_matches: parse_var("DEMO_MATCHES", 1usize)?,
            players_per_team,
            match_seed,
            chat_rate_limit: parse_var("CHAT_RATE_LIMIT", CHAT_RATE_LIMIT)?,
        })
    }
}

/// Read `var`, falling back to `default` when it is unset
fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variables_use_defaults() {
        assert_eq!(parse_var("VOLLEY_TEST_UNSET_VAR", 75u32).unwrap(), 75);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        env::set_var("VOLLEY_TEST_BAD_NUMBER", "fast");
        let err = parse_var("VOLLEY_TEST_BAD_NUMBER", 75u32).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: "VOLLEY_TEST_BAD_NUMBER", ref value } if value == "fast"
        ));
        env::remove_var("VOLLEY_TEST_BAD_NUMBER");
    }

    #[test]
    fn numbers_are_trimmed() {
        env::set_var("VOLLEY_TEST_PADDED_NUMBER", " 21 ");
        assert_eq!(parse_var("VOLLEY_TEST_PADDED_NUMBER", 15u32).unwrap(), 21);
        env::remove_var("VOLLEY_TEST_PADDED_NUMBER");
    }
}
