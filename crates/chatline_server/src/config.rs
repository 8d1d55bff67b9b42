//! Server configuration from the process environment.
//!
//! # Responsibility
//! - Read bind address, database path, rate limit and logging settings.
//! - Apply defaults for absent or blank values.
//!
//! # Invariants
//! - Loading never touches the database or the network.

use crate::http::RateLimit;
use chatline_core::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_BIND: &str = "CHATLINE_BIND";
pub const ENV_DB_PATH: &str = "CHATLINE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CHATLINE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CHATLINE_LOG_DIR";
pub const ENV_RATE_LIMIT_REQUESTS: &str = "CHATLINE_RATE_LIMIT_REQUESTS";
pub const ENV_RATE_LIMIT_WINDOW_SECS: &str = "CHATLINE_RATE_LIMIT_WINDOW_SECS";

const DEFAULT_BIND: &str = "0.0.0.0:3333";
const DEFAULT_DB_FILE_NAME: &str = "chatline.sqlite3";
const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

#[derive(Debug)]
pub enum ConfigError {
    InvalidBind { value: String, reason: String },
    InvalidNumber {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBind { value, reason } => {
                write!(f, "invalid {ENV_BIND} `{value}`: {reason}")
            }
            Self::InvalidNumber { key, value, reason } => {
                write!(f, "invalid {key} `{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    /// Per-client limit; zero requests or a zero window disables it.
    pub rate_limit: RateLimit,
    pub log_level: String,
    /// `None` logs to stderr.
    pub log_dir: Option<String>,
}

impl ServerConfig {
    /// Loads `.env` (when present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let bind_text = value(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_text
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::InvalidBind {
                value: bind_text.clone(),
                reason: err.to_string(),
            })?;

        let db_path = value(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));

        let requests = parse_number(ENV_RATE_LIMIT_REQUESTS, value(ENV_RATE_LIMIT_REQUESTS))?
            .unwrap_or(DEFAULT_RATE_LIMIT_REQUESTS);
        let window_secs =
            parse_number(ENV_RATE_LIMIT_WINDOW_SECS, value(ENV_RATE_LIMIT_WINDOW_SECS))?
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);

        Ok(Self {
            bind,
            db_path,
            rate_limit: RateLimit::new(requests, Duration::from_secs(window_secs)),
            log_level: value(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: value(ENV_LOG_DIR),
        })
    }
}

fn parse_number<N>(key: &'static str, raw: Option<String>) -> Result<Option<N>, ConfigError>
where
    N: std::str::FromStr,
    N::Err: Display,
{
    raw.map(|text| {
        text.parse::<N>().map_err(|err| ConfigError::InvalidNumber {
            key,
            reason: err.to_string(),
            value: text.clone(),
        })
    })
    .transpose()
}
