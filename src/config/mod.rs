//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::arena::catalog;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,
    /// Rules applied to every room
    pub game: GameSettings,
}

/// Match rules shared by every room on this server
#[derive(Clone, Debug)]
pub struct GameSettings {
    /// Kills needed to win a match
    pub kill_limit: u32,
    /// Maximum roster size per room
    pub max_players: usize,
    /// Minimum roster size to start a match
    pub min_players: usize,
    /// Cap on live projectiles owned by a single player
    pub max_projectiles_per_player: usize,
    /// Spawn protection window in milliseconds
    pub spawn_protection_ms: u64,
    /// Seconds counted down before combat begins
    pub countdown_secs: u32,
    /// Arena every match starts in
    pub arena_id: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            kill_limit: 10,
            max_players: 4,
            min_players: 2,
            max_projectiles_per_player: 30,
            spawn_protection_ms: 2000,
            countdown_secs: 3,
            arena_id: "foundry".to_string(),
        }
    }
}

impl GameSettings {
    /// Load game settings from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let settings = Self {
            kill_limit: parse_var("KILL_LIMIT", defaults.kill_limit)?,
            max_players: parse_var("MAX_PLAYERS_PER_ROOM", defaults.max_players)?,
            min_players: parse_var("MIN_PLAYERS_TO_START", defaults.min_players)?,
            max_projectiles_per_player: parse_var(
                "MAX_PROJECTILES_PER_PLAYER",
                defaults.max_projectiles_per_player,
            )?,
            spawn_protection_ms: parse_var("SPAWN_PROTECTION_MS", defaults.spawn_protection_ms)?,
            countdown_secs: parse_var("COUNTDOWN_SECS", defaults.countdown_secs)?,
            arena_id: env::var("ARENA_ID").unwrap_or(defaults.arena_id),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let arena = catalog()
            .get(&self.arena_id)
            .ok_or_else(|| ConfigError::UnknownArena(self.arena_id.clone()))?;

        if self.kill_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "KILL_LIMIT",
                value: self.kill_limit.to_string(),
            });
        }
        if self.min_players < 2 || self.min_players > self.max_players {
            return Err(ConfigError::Invalid {
                var: "MIN_PLAYERS_TO_START",
                value: self.min_players.to_string(),
            });
        }
        // Every combatant needs its own spawn point at match start
        if self.max_players > arena.spawn_points.len() {
            return Err(ConfigError::Invalid {
                var: "MAX_PLAYERS_PER_ROOM",
                value: self.max_players.to_string(),
            });
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            game: GameSettings::from_env()?,
        })
    }
}

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
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },

    #[error("Unknown arena: {0}")]
    UnknownArena(String),

    #[error("Invalid server address format")]
    InvalidAddress,
}
