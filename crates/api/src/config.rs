//! Process configuration read from the environment.
//!
//! | Variable                    | Default        |
//! |-----------------------------|----------------|
//! | `PANTRY_BIND_ADDR`          | `0.0.0.0:5000` |
//! | `PANTRY_DATABASE_URL`       | unset (in-memory store) |
//! | `PANTRY_DB_MAX_CONNECTIONS` | `5`            |
//! | `PANTRY_SEED`               | `true`         |

use std::net::SocketAddr;

use thiserror::Error;

pub const BIND_ADDR_ENV: &str = "PANTRY_BIND_ADDR";
pub const DATABASE_URL_ENV: &str = "PANTRY_DATABASE_URL";
pub const DB_MAX_CONNECTIONS_ENV: &str = "PANTRY_DB_MAX_CONNECTIONS";
pub const SEED_ENV: &str = "PANTRY_SEED";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Load the starter catalogue and accounts at startup.
    pub seed: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid(BIND_ADDR_ENV, &bind_raw, e.to_string()))?;

        let db_max_connections = match get(DB_MAX_CONNECTIONS_ENV) {
            None => DEFAULT_DB_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        DB_MAX_CONNECTIONS_ENV,
                        &raw,
                        "must be at least 1",
                    ));
                }
                Ok(n) => n,
                Err(e) => return Err(ConfigError::invalid(DB_MAX_CONNECTIONS_ENV, &raw, e.to_string())),
            },
        };

        let seed = match get(SEED_ENV) {
            None => true,
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::invalid(SEED_ENV, &raw, "expected true or false"))?,
        };

        Ok(Self {
            bind_addr,
            database_url: get(DATABASE_URL_ENV).map(|v| v.trim().to_string()),
            db_max_connections,
            seed,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
