//! The persisted row type and its conversion from the raw provider record.

use std::fmt;
use std::str::FromStr;

use alphavantage_api::types::RawDailyQuote;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::validation::parse_trade_date;

/// One row of `stock_data`: a symbol's OHLCV for one trading date.
///
/// `(symbol, date)` is the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDailyBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// What to do when a record lacks one of the five numeric fields.
///
/// A present-but-malformed value is always a row error; this only governs
/// absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingFieldPolicy {
    /// Store 0 for the missing field.
    #[default]
    ZeroFill,
    /// Fail the row.
    Reject,
}

impl FromStr for MissingFieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zero" | "zero-fill" | "zerofill" => Ok(Self::ZeroFill),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown missing-field policy '{}'. Valid values: zero, reject",
                other
            )),
        }
    }
}

impl fmt::Display for MissingFieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroFill => write!(f, "zero"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Why a single date's record could not be stored.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    #[error("record is not a quote object: {0}")]
    Malformed(String),
    #[error("field '{field}' is missing")]
    MissingField { field: &'static str },
    #[error("field '{field}' has non-numeric value '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field '{field}' is negative: {value}")]
    Negative { field: &'static str, value: String },
    #[error("database error: {0}")]
    Database(String),
}

impl StockDailyBar {
    /// Convert one raw record.
    ///
    /// Prices must parse as finite decimals; volume as a non-negative integer.
    pub fn from_raw(
        symbol: &str,
        date: &str,
        raw: &RawDailyQuote,
        policy: MissingFieldPolicy,
    ) -> Result<Self, RowError> {
        let parsed_date =
            parse_trade_date(date).ok_or_else(|| RowError::InvalidDate(date.to_string()))?;

        Ok(Self {
            symbol: symbol.to_string(),
            date: parsed_date,
            open: parse_price("open", raw.open.as_deref(), policy)?,
            high: parse_price("high", raw.high.as_deref(), policy)?,
            low: parse_price("low", raw.low.as_deref(), policy)?,
            close: parse_price("close", raw.close.as_deref(), policy)?,
            volume: parse_volume(raw.volume.as_deref(), policy)?,
        })
    }
}

fn parse_price(
    field: &'static str,
    value: Option<&str>,
    policy: MissingFieldPolicy,
) -> Result<f64, RowError> {
    let Some(raw) = value else {
        return missing(field, policy).map(|_| 0.0);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RowError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

fn parse_volume(value: Option<&str>, policy: MissingFieldPolicy) -> Result<i64, RowError> {
    let Some(raw) = value else {
        return missing("volume", policy).map(|_| 0);
    };
    let v = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| RowError::InvalidNumber {
            field: "volume",
            value: raw.to_string(),
        })?;
    if v < 0 {
        return Err(RowError::Negative {
            field: "volume",
            value: raw.to_string(),
        });
    }
    Ok(v)
}

fn missing(field: &'static str, policy: MissingFieldPolicy) -> Result<(), RowError> {
    match policy {
        MissingFieldPolicy::ZeroFill => Ok(()),
        MissingFieldPolicy::Reject => Err(RowError::MissingField { field }),
    }
}
