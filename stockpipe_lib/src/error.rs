//! Error types for configuration and input validation.

/// Problems with the environment or caller-supplied input that no amount of
/// retrying will fix.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
    /// An environment variable is set to a value we cannot interpret.
    #[error("environment variable {key} has invalid value '{value}'")]
    InvalidVar { key: &'static str, value: String },
    /// The ticker symbol failed validation.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
}
