//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use tabkeep_infra::session::DEFAULT_SESSION_TTL;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub session_ttl: Duration,
    /// Mark the session cookie `Secure` (TLS is terminated in front of us).
    pub cookie_secure: bool,
    /// Take the caller address from `X-Forwarded-For` instead of the socket.
    pub trust_forwarded_for: bool,
    pub cache_op_timeout: Duration,
    /// Redis session cache; in-memory when unset.
    pub redis_url: Option<String>,
    /// Postgres store; in-memory when unset.
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            session_ttl: DEFAULT_SESSION_TTL,
            cookie_secure: false,
            trust_forwarded_for: false,
            cache_op_timeout: Duration::from_millis(500),
            redis_url: None,
            database_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; unset or empty variables keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", defaults.bind_addr)?,
            session_ttl: get("SESSION_TTL_SECS")
                .map(|v| parse::<u64>(&v, "SESSION_TTL_SECS"))
                .transpose()?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            cookie_secure: parse_bool(
                get("COOKIE_SECURE"),
                "COOKIE_SECURE",
                defaults.cookie_secure,
            )?,
            trust_forwarded_for: parse_bool(
                get("TRUST_FORWARDED_FOR"),
                "TRUST_FORWARDED_FOR",
                defaults.trust_forwarded_for,
            )?,
            cache_op_timeout: get("CACHE_OP_TIMEOUT_MS")
                .map(|v| parse::<u64>(&v, "CACHE_OP_TIMEOUT_MS"))
                .transpose()?
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_op_timeout),
            redis_url: get("REDIS_URL"),
            database_url: get("DATABASE_URL"),
        };

        if config.session_ttl.is_zero() {
            return Err(ConfigError {
                var: "SESSION_TTL_SECS",
                reason: "must be positive".to_string(),
            });
        }
        if !config.cookie_secure {
            tracing::warn!("COOKIE_SECURE not set; session cookie will be sent over plain HTTP");
        }

        Ok(config)
    }
}

fn parse<T>(value: &str, var: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError {
        var,
        reason: e.to_string(),
    })
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map(|v| parse(&v, var)).transpose().map(|v| v.unwrap_or(default))
}

fn parse_bool(
    value: Option<String>,
    var: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError {
                var,
                reason: format!("expected a boolean, got '{other}'"),
            }),
        },
    }
}
