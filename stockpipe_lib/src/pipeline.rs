//! The fetch-and-store routine.
//!
//! One run moves a single symbol through fixed phases:
//!
//! - fetch the daily series (bounded retry with backoff)
//! - validate that the payload actually carries a series
//! - connect to the database (bounded retry with backoff)
//! - ensure the `stock_data` table exists
//! - upsert each date's bar in its own transaction
//!
//! A run never returns an error. Whatever happens is logged and summarized
//! in a [`RunOutcome`] so the caller (usually an external scheduler) can
//! decide whether to alert.

use std::fmt;

use alphavantage_api::types::DailySeriesResponse;
use alphavantage_api::Client;
use serde::Serialize;

use crate::bar::{RowError, StockDailyBar};
use crate::config::PipelineConfig;
use crate::db::{Db, DbError, InsertOutcome};
use crate::error::ConfigError;
use crate::retry::with_retry;
use crate::validation::validate_symbol;

/// Message used when the provider omits the series without saying why.
pub const NO_DIAGNOSTIC: &str = "response contained no time series and no diagnostic message";

/// Message used when the series field is present but not a date-keyed object.
pub const MALFORMED_SERIES: &str = "time series is not a date-keyed object";

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Start,
    Fetching,
    Validating,
    Connecting,
    SchemaReady,
    Upserting,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Fetching => "fetching",
            Self::Validating => "validating",
            Self::Connecting => "connecting",
            Self::SchemaReady => "schema-ready",
            Self::Upserting => "upserting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why a run stopped before reaching the upsert loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AbortReason {
    /// Missing API key, bad symbol, bad setting. Never retried.
    ///
    /// Most are caught before fetching; a missing database name only
    /// surfaces when connecting.
    Config { phase: Phase, message: String },
    /// The HTTP call kept failing, or returned something unparseable.
    Fetch { attempts: u32, error: String },
    /// The provider answered but withheld the series.
    Upstream { message: String },
    /// The database could not be opened.
    Connect { attempts: u32, error: String },
    /// The table could not be created.
    Schema(String),
}

impl AbortReason {
    /// The phase the run was in when it stopped.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Config { phase, .. } => *phase,
            Self::Fetch { .. } => Phase::Fetching,
            Self::Upstream { .. } => Phase::Validating,
            Self::Connect { .. } => Phase::Connecting,
            Self::Schema(_) => Phase::SchemaReady,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, .. } => write!(f, "configuration error: {}", message),
            Self::Fetch { attempts, error } => {
                write!(f, "fetch failed after {} attempt(s): {}", attempts, error)
            }
            Self::Upstream { message } => write!(f, "provider returned no data: {}", message),
            Self::Connect { attempts, error } => {
                write!(f, "database connection failed after {} attempt(s): {}", attempts, error)
            }
            Self::Schema(msg) => write!(f, "schema setup failed: {}", msg),
        }
    }
}

impl AbortReason {
    fn config(phase: Phase, message: impl fmt::Display) -> Self {
        Self::Config {
            phase,
            message: message.to_string(),
        }
    }
}

/// Configuration problems found before any work starts.
impl From<ConfigError> for AbortReason {
    fn from(e: ConfigError) -> Self {
        Self::config(Phase::Start, e)
    }
}

/// Log line for an aborted run, naming the symbol as it would have been stored.
pub fn abort_message(symbol: &str, reason: &AbortReason) -> String {
    format!(
        "Aborted {} during {}: {}",
        symbol.trim().to_uppercase(),
        reason.phase(),
        reason
    )
}

/// A date whose record was not stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub date: String,
    pub reason: String,
}

/// Counts for a run that reached the upsert loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub symbol: String,
    /// Records present in the provider's series.
    pub received: usize,
    pub inserted: usize,
    /// Records whose key was already stored.
    pub skipped_existing: usize,
    pub failed: Vec<RowFailure>,
}

impl RunSummary {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunOutcome {
    Completed(RunSummary),
    Aborted(AbortReason),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Completed(s) => Some(s),
            Self::Aborted(_) => None,
        }
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            Self::Completed(_) => None,
            Self::Aborted(r) => Some(r),
        }
    }
}

/// A configured fetch-and-store routine.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch `symbol`'s daily series and store every bar not already present.
    pub async fn fetch_and_store(&self, symbol: &str) -> RunOutcome {
        match self.run(symbol).await {
            Ok(summary) => {
                if summary.failed.is_empty() {
                    tracing::info!(
                        "Successfully fetched and stored data for {}: {} received, {} inserted, {} already present",
                        summary.symbol,
                        summary.received,
                        summary.inserted,
                        summary.skipped_existing
                    );
                } else {
                    tracing::warn!(
                        "Fetched and stored data for {} with {} failed row(s): {} received, {} inserted, {} already present",
                        summary.symbol,
                        summary.failed.len(),
                        summary.received,
                        summary.inserted,
                        summary.skipped_existing
                    );
                }
                RunOutcome::Completed(summary)
            }
            Err(reason) => {
                tracing::error!("{}", abort_message(symbol, &reason));
                RunOutcome::Aborted(reason)
            }
        }
    }

    async fn run(&self, symbol: &str) -> Result<RunSummary, AbortReason> {
        let symbol = validate_symbol(symbol)?;
        if self.config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingVar(crate::config::API_KEY_VAR).into());
        }

        enter(&symbol, Phase::Fetching);
        let response = self.fetch(&symbol).await?;

        enter(&symbol, Phase::Validating);
        validate_response(&response)?;
        if let Some(refreshed) = response
            .meta_data
            .as_ref()
            .and_then(|m| m.last_refreshed.as_deref())
        {
            tracing::debug!("{} series last refreshed {}", symbol, refreshed);
        }

        enter(&symbol, Phase::Connecting);
        let mut db = self.connect().await?;
        db.ensure_schema()
            .map_err(|e| AbortReason::Schema(e.to_string()))?;

        enter(&symbol, Phase::Upserting);
        let summary = self.upsert_all(&mut db, &symbol, &response);

        if let Err(e) = db.close() {
            tracing::warn!("Closing database after storing {} failed: {}", symbol, e);
        }
        enter(&symbol, Phase::Done);
        Ok(summary)
    }

    async fn fetch(&self, symbol: &str) -> Result<DailySeriesResponse, AbortReason> {
        let client = Client::with_base_url(&self.config.base_url, self.config.api_key.as_str())
            .map_err(|e| {
                AbortReason::config(Phase::Fetching, format!("failed to build HTTP client: {}", e))
            })?;

        let label = format!("Fetching {}", symbol);
        with_retry(
            &self.config.fetch_retry,
            &label,
            alphavantage_api::Error::is_transient,
            || client.get_daily_series(symbol),
        )
        .await
        .map_err(|e| AbortReason::Fetch {
            attempts: e.attempts,
            error: e.error.to_string(),
        })
    }

    async fn connect(&self) -> Result<Db, AbortReason> {
        let db_config = &self.config.db;
        with_retry(
            &self.config.connect_retry,
            "Database connection",
            DbError::is_transient,
            || async { Db::connect(db_config) },
        )
        .await
        .map_err(|e| match e.error {
            DbError::NotConfigured(cfg) => AbortReason::config(Phase::Connecting, cfg),
            other => AbortReason::Connect {
                attempts: e.attempts,
                error: other.to_string(),
            },
        })
    }

    fn upsert_all(&self, db: &mut Db, symbol: &str, response: &DailySeriesResponse) -> RunSummary {
        let mut summary = RunSummary::new(symbol);
        for (date, raw) in response.entries() {
            summary.received += 1;
            let result = raw
                .map_err(|e| RowError::Malformed(e.to_string()))
                .and_then(|raw| {
                    StockDailyBar::from_raw(symbol, date, &raw, self.config.missing_fields)
                })
                .and_then(|bar| {
                    db.insert_bar(&bar)
                        .map_err(|e| RowError::Database(e.to_string()))
                });
            match result {
                Ok(InsertOutcome::Inserted) => summary.inserted += 1,
                Ok(InsertOutcome::AlreadyPresent) => {
                    tracing::debug!("{} {} already stored, left unchanged", symbol, date);
                    summary.skipped_existing += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to store {} for {}: {}", date, symbol, e);
                    summary.failed.push(RowFailure {
                        date: date.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        summary
    }
}

/// Run one symbol with configuration read from the environment right now.
///
/// A missing API key aborts before any network traffic.
pub async fn fetch_and_store(symbol: &str) -> RunOutcome {
    match PipelineConfig::from_env() {
        Ok(config) => Pipeline::new(config).fetch_and_store(symbol).await,
        Err(e) => {
            let reason = AbortReason::from(e);
            tracing::error!("{}", abort_message(symbol, &reason));
            RunOutcome::Aborted(reason)
        }
    }
}

fn enter(symbol: &str, phase: Phase) {
    tracing::debug!("{}: {}", symbol, phase);
}

/// Pass a payload that carries a usable series; otherwise surface the provider's reason.
fn validate_response(response: &DailySeriesResponse) -> Result<(), AbortReason> {
    if response.series().is_some() {
        return Ok(());
    }
    let message = match (response.diagnostic(), &response.time_series) {
        (Some(diagnostic), _) => diagnostic,
        (None, Some(_)) => MALFORMED_SERIES,
        (None, None) => NO_DIAGNOSTIC,
    };
    Err(AbortReason::Upstream {
        message: message.to_string(),
    })
}
