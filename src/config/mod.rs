//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::game::{GameConfig, MAX_PLAYERS, PROJECTILE_TICK_MS};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Shared secret for join proofs (HMAC-SHA256 key)
    pub admission_secret: String,
    /// Allowed client origins for CORS, comma-separated; "*" allows any
    pub client_origin: String,

    /// Interval between projectile steps
    pub projectile_tick: Duration,
    /// Whether tanks may join between a victory and the next reset
    pub allow_join_after_victory: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PORT wins over SERVER_ADDR when both are set
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let projectile_tick_ms = match env::var("PROJECTILE_TICK_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidValue("PROJECTILE_TICK_MS"))?,
            Err(_) => PROJECTILE_TICK_MS,
        };

        let allow_join_after_victory = match env::var("ALLOW_JOIN_AFTER_VICTORY") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidValue("ALLOW_JOIN_AFTER_VICTORY"))?,
            Err(_) => true,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            admission_secret: env::var("ADMISSION_SECRET")
                .map_err(|_| ConfigError::Missing("ADMISSION_SECRET"))?,
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            projectile_tick: Duration::from_millis(projectile_tick_ms),
            allow_join_after_victory,
        })
    }

    /// Match tunables derived from this configuration
    pub fn game(&self) -> GameConfig {
        GameConfig {
            max_players: MAX_PLAYERS,
            projectile_tick: self.projectile_tick,
            allow_join_after_victory: self.allow_join_after_victory,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
