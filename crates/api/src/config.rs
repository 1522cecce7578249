//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use chrono::{FixedOffset, Local, Offset};
use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "SHOPFLOOR_BIND_ADDR";
pub const PERSISTENT_VAR: &str = "USE_PERSISTENT_STORES";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const UTC_OFFSET_VAR: &str = "SHOPFLOOR_UTC_OFFSET";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    BindAddr { var: &'static str, value: String },

    #[error("{var} must be an offset like +03:00, got {value}")]
    UtcOffset { var: &'static str, value: String },

    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// `Some` selects the Postgres stores; `None` keeps everything in memory.
    pub database_url: Option<String>,
    /// Offset used to render timestamps in responses.
    pub utc_offset: FixedOffset,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::BindAddr {
            var: BIND_ADDR_VAR,
            value: bind_raw.clone(),
        })?;

        let persistent = lookup(PERSISTENT_VAR)
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(false);
        let database_url = if persistent {
            Some(lookup(DATABASE_URL_VAR).ok_or(ConfigError::MissingDatabaseUrl)?)
        } else {
            None
        };

        let utc_offset = match lookup(UTC_OFFSET_VAR) {
            Some(raw) => parse_offset(&raw).ok_or(ConfigError::UtcOffset {
                var: UTC_OFFSET_VAR,
                value: raw,
            })?,
            None => Local::now().offset().fix(),
        };

        Ok(Self {
            bind_addr,
            database_url,
            utc_offset,
        })
    }

    /// In-memory configuration on an ephemeral local port.
    pub fn in_memory(utc_offset: FixedOffset) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            utc_offset,
        }
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HH`, `Z` or `UTC`.
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match *raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
