use chrono::NaiveDate;

use crate::error::ConfigError;

/// Longest ticker the `stock_data.symbol` column is meant to hold.
pub const MAX_SYMBOL_LENGTH: usize = 10;

/// Validate a ticker symbol: trim, uppercase, 1..=10 chars of `A-Z`, `0-9`, `.` or `-`.
pub fn validate_symbol(input: &str) -> Result<String, ConfigError> {
    let upper = input.trim().to_uppercase();
    if upper.is_empty() {
        return Err(ConfigError::InvalidSymbol("symbol is empty".to_string()));
    }
    if upper.len() > MAX_SYMBOL_LENGTH {
        return Err(ConfigError::InvalidSymbol(format!(
            "'{}' exceeds maximum length of {} characters",
            upper, MAX_SYMBOL_LENGTH
        )));
    }
    if let Some(bad) = upper
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
    {
        return Err(ConfigError::InvalidSymbol(format!(
            "'{}' contains invalid character '{}'",
            upper, bad
        )));
    }
    Ok(upper)
}

/// Parse a YYYY-MM-DD trading date as the provider keys its series.
pub fn parse_trade_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}
