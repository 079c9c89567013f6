//! Library layer for stockpipe: fetch a symbol's daily prices and store them idempotently.
//!
//! Wraps the `alphavantage_api` client with bounded retry, validates the
//! provider's payload, and upserts each trading day into SQLite.

pub mod bar;
pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod validation;

pub use alphavantage_api;

pub use bar::{MissingFieldPolicy, RowError, StockDailyBar};
pub use config::{DbConfig, PipelineConfig};
pub use db::{Db, DbError, InsertOutcome};
pub use error::ConfigError;
pub use pipeline::{
    abort_message, fetch_and_store, AbortReason, Phase, Pipeline, RowFailure, RunOutcome, RunSummary,
};
pub use retry::{with_retry, RetryError, RetryPolicy};
