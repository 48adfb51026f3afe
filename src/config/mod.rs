//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use glam::Vec2;

use crate::game::StageSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma-separated; `*` allows any
    pub client_origin: String,

    /// World size and content counts for every new match
    pub stage: StageSettings,

    /// Minimum queued players to start a match
    pub min_players: usize,
    /// Maximum players per match
    pub max_players: usize,
    /// Start with fewer players once the oldest has waited this long
    pub queue_max_wait_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source. Every variable is
    /// optional; set but unparseable values are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let defaults = StageSettings::default();
        let stage = StageSettings {
            width: parse_or(&lookup, "WORLD_WIDTH", defaults.width)?,
            height: parse_or(&lookup, "WORLD_HEIGHT", defaults.height)?,
            num_crates: parse_or(&lookup, "NUM_CRATES", defaults.num_crates)?,
            num_bushes: parse_or(&lookup, "NUM_BUSHES", defaults.num_bushes)?,
            num_ammo: parse_or(&lookup, "NUM_AMMO", defaults.num_ammo)?,
            num_hp_pots: parse_or(&lookup, "NUM_HP_POTS", defaults.num_hp_pots)?,
            num_speed_boost: parse_or(&lookup, "NUM_SPEED_BOOST", defaults.num_speed_boost)?,
            num_scope: parse_or(&lookup, "NUM_SCOPE", defaults.num_scope)?,
            num_small_gun: parse_or(&lookup, "NUM_SMALL_GUN", defaults.num_small_gun)?,
            num_big_gun: parse_or(&lookup, "NUM_BIG_GUN", defaults.num_big_gun)?,
            viewport: Vec2::new(
                parse_or(&lookup, "VIEWPORT_WIDTH", defaults.viewport.x)?,
                parse_or(&lookup, "VIEWPORT_HEIGHT", defaults.viewport.y)?,
            ),
        };
        if !(stage.width > 0.0 && stage.height > 0.0) {
            return Err(ConfigError::Invalid("WORLD_WIDTH/WORLD_HEIGHT"));
        }

        let min_players = parse_or(&lookup, "MIN_PLAYERS", 2)?;
        let max_players = parse_or(&lookup, "MAX_PLAYERS", 10)?;
        if min_players == 0 || max_players < min_players {
            return Err(ConfigError::Invalid("MIN_PLAYERS/MAX_PLAYERS"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            stage,
            min_players,
            max_players,
            queue_max_wait_secs: parse_or(&lookup, "QUEUE_MAX_WAIT_SECS", 30)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_any_variables() {
        let config = config(&[]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.client_origin, "*");
        assert_eq!(config.stage, StageSettings::default());
        assert_eq!(config.min_players, 2);
        assert_eq!(config.max_players, 10);
        assert_eq!(config.queue_max_wait_secs, 30);
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = config(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1234")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn world_settings_are_read() {
        let config = config(&[("WORLD_WIDTH", "3000"), ("NUM_CRATES", "0"), ("VIEWPORT_WIDTH", "800")]).unwrap();
        assert_eq!(config.stage.width, 3000.0);
        assert_eq!(config.stage.height, 2500.0);
        assert_eq!(config.stage.num_crates, 0);
        assert_eq!(config.stage.viewport, Vec2::new(800.0, 1080.0));
    }

    #[test]
    fn unparseable_values_are_rejected() {
        assert!(matches!(config(&[("NUM_AMMO", "lots")]), Err(ConfigError::Invalid("NUM_AMMO"))));
        assert!(matches!(config(&[("SERVER_ADDR", "nowhere")]), Err(ConfigError::InvalidAddress)));
        assert!(matches!(
            config(&[("MIN_PLAYERS", "5"), ("MAX_PLAYERS", "3")]),
            Err(ConfigError::Invalid(_))
        ));
    }
}
