//! Runtime configuration read from `CARELINK_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Which `RecordStore` backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

/// Where formatted log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    pub db_path: PathBuf,
    pub session_ttl: Duration,
    /// When set, `markRead` leaves other users' notifications untouched.
    pub strict_notification_ownership: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            storage: StorageBackend::Sqlite,
            db_path: PathBuf::from("carelink.db"),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            strict_notification_ownership: false,
            log_mode: LogMode::Stdout,
            log_file: PathBuf::from("carelink.log"),
        }
    }
}

impl PortalConfig {
    /// Load from the process environment, falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    /// Returns error if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns error if a variable is set to an unparseable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("CARELINK_BIND_ADDR") {
            cfg.bind_addr = v
                .parse()
                .map_err(|e| ConfigError::invalid("CARELINK_BIND_ADDR", &v, e))?;
        }

        if let Some(v) = get("CARELINK_STORAGE") {
            cfg.storage = match v.to_ascii_lowercase().as_str() {
                "sqlite" => StorageBackend::Sqlite,
                "memory" => StorageBackend::Memory,
                _ => {
                    return Err(ConfigError::invalid(
                        "CARELINK_STORAGE",
                        &v,
                        "expected sqlite or memory",
                    ))
                }
            };
        }

        if let Some(v) = get("CARELINK_DB_PATH") {
            cfg.db_path = PathBuf::from(v);
        }

        if let Some(v) = get("CARELINK_SESSION_TTL_SECS") {
            let secs = v
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid("CARELINK_SESSION_TTL_SECS", &v, e))?;
            if secs == 0 {
                return Err(ConfigError::invalid(
                    "CARELINK_SESSION_TTL_SECS",
                    &v,
                    "must be positive",
                ));
            }
            cfg.session_ttl = Duration::from_secs(secs);
        }

        if let Some(v) = get("CARELINK_STRICT_NOTIFICATION_OWNERSHIP") {
            cfg.strict_notification_ownership = parse_flag(&v).ok_or_else(|| {
                ConfigError::invalid(
                    "CARELINK_STRICT_NOTIFICATION_OWNERSHIP",
                    &v,
                    "expected true or false",
                )
            })?;
        }

        if let Some(v) = get("CARELINK_LOG_MODE") {
            cfg.log_mode = match v.to_ascii_lowercase().as_str() {
                "stdout" => LogMode::Stdout,
                "file" => LogMode::File,
                _ => {
                    return Err(ConfigError::invalid(
                        "CARELINK_LOG_MODE",
                        &v,
                        "expected stdout or file",
                    ))
                }
            };
        }

        if let Some(v) = get("CARELINK_LOG_FILE") {
            cfg.log_file = PathBuf::from(v);
        }

        Ok(cfg)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
