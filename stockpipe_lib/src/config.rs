//! Runtime configuration, read from the process environment at call time.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bar::MissingFieldPolicy;
use crate::error::ConfigError;
use crate::retry::RetryPolicy;

pub const API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";
pub const BASE_URL_VAR: &str = "ALPHA_VANTAGE_BASE_URL";
pub const DB_NAME_VAR: &str = "STOCK_DB_NAME";
pub const DB_HOST_VAR: &str = "STOCK_DB_HOST";
pub const BACKOFF_UNIT_VAR: &str = "STOCKPIPE_BACKOFF_UNIT_MS";
pub const FETCH_ATTEMPTS_VAR: &str = "STOCKPIPE_FETCH_ATTEMPTS";
pub const CONNECT_ATTEMPTS_VAR: &str = "STOCKPIPE_CONNECT_ATTEMPTS";
pub const MISSING_FIELDS_VAR: &str = "STOCK_MISSING_FIELDS";

/// Directory holding the database file when `STOCK_DB_HOST` is unset.
pub const DEFAULT_DB_HOST: &str = "data";
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;

/// Where the database lives: a SQLite file at `<host>/<name>.sqlite`.
///
/// SQLite has no accounts, so there are no credentials to carry; access is
/// governed by filesystem permissions on `host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub name: Option<String>,
    /// Directory holding the database file.
    pub host: String,
}

impl DbConfig {
    /// A config pointing at `<host>/<name>.sqlite`.
    pub fn new(host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            host: host.into(),
        }
    }

    pub fn from_env() -> Self {
        Self {
            name: env_string(DB_NAME_VAR),
            host: env_string(DB_HOST_VAR).unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
        }
    }

    /// Path of the database file. A name without an extension gets `.sqlite`.
    pub fn path(&self) -> Result<PathBuf, ConfigError> {
        let name = self
            .name
            .as_deref()
            .ok_or(ConfigError::MissingVar(DB_NAME_VAR))?;
        let file = if Path::new(name).extension().is_some() {
            name.to_string()
        } else {
            format!("{}.sqlite", name)
        };
        Ok(Path::new(&self.host).join(file))
    }
}

/// Everything one fetch-and-store run needs.
#[derive(Clone)]
pub struct PipelineConfig {
    pub api_key: String,
    pub base_url: String,
    pub db: DbConfig,
    pub fetch_retry: RetryPolicy,
    pub connect_retry: RetryPolicy,
    pub missing_fields: MissingFieldPolicy,
}

impl PipelineConfig {
    /// Defaults for everything but the key and the database location.
    pub fn new(api_key: impl Into<String>, db: DbConfig) -> Self {
        let unit = Duration::from_millis(DEFAULT_BACKOFF_UNIT_MS);
        Self {
            api_key: api_key.into(),
            base_url: alphavantage_api::DEFAULT_BASE_URL.to_string(),
            db,
            fetch_retry: RetryPolicy::new(DEFAULT_FETCH_ATTEMPTS, unit),
            connect_retry: RetryPolicy::new(DEFAULT_CONNECT_ATTEMPTS, unit),
            missing_fields: MissingFieldPolicy::default(),
        }
    }

    /// Reads the whole configuration from the environment.
    ///
    /// Only the API key is mandatory here; a missing database name surfaces
    /// later, when the connect phase asks for the file path.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_string(API_KEY_VAR).ok_or(ConfigError::MissingVar(API_KEY_VAR))?;
        let unit = Duration::from_millis(env_u64(BACKOFF_UNIT_VAR, DEFAULT_BACKOFF_UNIT_MS));
        let missing_fields = match env_string(MISSING_FIELDS_VAR) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                key: MISSING_FIELDS_VAR,
                value: raw,
            })?,
            None => MissingFieldPolicy::default(),
        };

        Ok(Self {
            api_key,
            base_url: env_string(BASE_URL_VAR)
                .unwrap_or_else(|| alphavantage_api::DEFAULT_BASE_URL.to_string()),
            db: DbConfig::from_env(),
            fetch_retry: RetryPolicy::new(env_u32(FETCH_ATTEMPTS_VAR, DEFAULT_FETCH_ATTEMPTS), unit),
            connect_retry: RetryPolicy::new(
                env_u32(CONNECT_ATTEMPTS_VAR, DEFAULT_CONNECT_ATTEMPTS),
                unit,
            ),
            missing_fields,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the backoff time unit for both retry phases.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.fetch_retry.base_delay = unit;
        self.connect_retry.base_delay = unit;
        self
    }

    pub fn with_missing_fields(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_fields = policy;
        self
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("db", &self.db)
            .field("fetch_retry", &self.fetch_retry)
            .field("connect_retry", &self.connect_retry)
            .field("missing_fields", &self.missing_fields)
            .finish()
    }
}

/// Unset and blank are the same thing.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<u32>().ok())
        .unwrap_or(default)
}
