//! Store configuration.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `FEEDCACHE_PATH` | Store file (`:memory:` for an anonymous in-memory store) |
//! | `FEEDCACHE_READ_ONLY` | `1`/`true` opens the store read-only (default: false) |
//! | `FEEDCACHE_DECODE_POLICY` | `strict` (default) or `skip-malformed` |
//! | `FEEDCACHE_BUSY_TIMEOUT_MS` | Engine busy timeout in milliseconds (default: 5000) |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::codec::DecodePolicy;

pub const ENV_PATH: &str = "FEEDCACHE_PATH";
pub const ENV_READ_ONLY: &str = "FEEDCACHE_READ_ONLY";
pub const ENV_DECODE_POLICY: &str = "FEEDCACHE_DECODE_POLICY";
pub const ENV_BUSY_TIMEOUT_MS: &str = "FEEDCACHE_BUSY_TIMEOUT_MS";

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MEMORY_LOCATION: &str = ":memory:";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Where the persisted slot lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLocation {
    File(PathBuf),
    /// `None` is private to one store; a name is shared by every store in
    /// the process that uses it while at least one of them is open.
    InMemory(Option<String>),
}

impl StoreLocation {
    pub fn parse(s: &str) -> Self {
        if s == MEMORY_LOCATION {
            Self::InMemory(None)
        } else {
            Self::File(PathBuf::from(s))
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::InMemory(None) => f.write_str(MEMORY_LOCATION),
            Self::InMemory(Some(name)) => write!(f, "memory:{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    pub location: StoreLocation,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub decode_policy: DecodePolicy,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT.as_millis() as u64
}

impl StoreConfig {
    pub fn new(location: StoreLocation) -> Self {
        Self {
            location,
            read_only: false,
            decode_policy: DecodePolicy::default(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(StoreLocation::File(path.into()))
    }

    pub fn memory() -> Self {
        Self::new(StoreLocation::InMemory(None))
    }

    pub fn shared_memory(name: impl Into<String>) -> Self {
        Self::new(StoreLocation::InMemory(Some(name.into())))
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Build from `FEEDCACHE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(ENV_PATH).map_err(|_| ConfigError::Missing { var: ENV_PATH })?;
        let mut cfg = Self::new(StoreLocation::parse(&path));

        if let Ok(v) = std::env::var(ENV_READ_ONLY) {
            cfg.read_only = parse_bool(&v).ok_or(ConfigError::Invalid {
                var: ENV_READ_ONLY,
                value: v,
            })?;
        }
        if let Ok(v) = std::env::var(ENV_DECODE_POLICY) {
            cfg.decode_policy = DecodePolicy::parse(&v).ok_or(ConfigError::Invalid {
                var: ENV_DECODE_POLICY,
                value: v,
            })?;
        }
        if let Ok(v) = std::env::var(ENV_BUSY_TIMEOUT_MS) {
            cfg.busy_timeout_ms = v.trim().parse().map_err(|_| ConfigError::Invalid {
                var: ENV_BUSY_TIMEOUT_MS,
                value: v,
            })?;
        }

        Ok(cfg)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
