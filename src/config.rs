//! Process configuration, read once at startup.
//!
//! Every value comes from an environment variable with a fallback default. Empty values are
//! treated like missing ones. Use [`Config::from_env`] in the binary and
//! [`Config::from_lookup`] wherever the environment should not be touched (tests).

use crate::logging::LogLevel;
use std::env;
use std::time::Duration;

pub const ENV_APP_NAME: &str = "APP_NAME";
pub const ENV_APP_VERSION: &str = "APP_VERSION";
pub const ENV_ENVIRONMENT: &str = "ENV";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_READ_TIMEOUT: &str = "READ_TIMEOUT";
pub const ENV_WRITE_TIMEOUT: &str = "WRITE_TIMEOUT";
pub const ENV_REDIS_HOST: &str = "REDIS_HOST";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_OUTPUT: &str = "LOG_OUTPUT";

pub const DEFAULT_APP_NAME: &str = "service-template";
pub const DEFAULT_APP_VERSION: &str = "DEVELOPMENT-SNAPSHOT-VERSION";
pub const DEFAULT_ENVIRONMENT: &str = "local";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_REDIS_HOST: &str = "localhost:6379";
pub const DEFAULT_LOG_OUTPUT: &str = "stdout";

/// Fully resolved service configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub environment: String,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for receiving the request head.
    pub read_timeout: Duration,
    /// Deadline for producing the response once the request has been received.
    pub write_timeout: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// `host:port` or a complete `redis://` URL.
    pub address: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// `stdout`, `stderr` or a file path.
    pub output: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through the given lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let get_or = |key: &str, fallback: &str| get(key).unwrap_or_else(|| fallback.to_string());

        Config {
            app_name: get_or(ENV_APP_NAME, DEFAULT_APP_NAME),
            app_version: get_or(ENV_APP_VERSION, DEFAULT_APP_VERSION),
            environment: get_or(ENV_ENVIRONMENT, DEFAULT_ENVIRONMENT),
            server: ServerConfig {
                host: get_or(ENV_HOST, DEFAULT_HOST),
                port: get(ENV_PORT)
                    .and_then(|port| port.parse().ok())
                    .unwrap_or(DEFAULT_PORT),
                read_timeout: get(ENV_READ_TIMEOUT)
                    .and_then(|value| parse_duration(&value))
                    .unwrap_or(DEFAULT_READ_TIMEOUT),
                write_timeout: get(ENV_WRITE_TIMEOUT)
                    .and_then(|value| parse_duration(&value))
                    .unwrap_or(DEFAULT_WRITE_TIMEOUT),
            },
            store: StoreConfig {
                address: get_or(ENV_REDIS_HOST, DEFAULT_REDIS_HOST),
            },
            logging: LoggingConfig {
                level: LogLevel::from_setting(get(ENV_LOG_LEVEL).as_deref()),
                output: get_or(ENV_LOG_OUTPUT, DEFAULT_LOG_OUTPUT),
            },
        }
    }

    /// The address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parses durations like `250ms`, `5s`, `2m` or `1h30m`.
///
/// A bare number is taken as seconds. Returns `None` for anything else, including values
/// which overflow.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = value;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit())?;
        if digits == 0 {
            return None;
        }
        let amount: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = match &rest[..unit_len] {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.checked_mul(60)?),
            "h" => Duration::from_secs(amount.checked_mul(3600)?),
            _ => return None,
        };
        total = total.checked_add(unit)?;
        rest = &rest[unit_len..];
    }

    Some(total)
}
