//! Error types for the API client.

/// Errors that can occur when making API requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request URL could not be built from the base URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Transport-level failure (connect, timeout, body read).
    ///
    /// The request URL is stripped: it carries the API key.
    #[error("Request failed: {0}")]
    Network(reqwest::Error),
    /// The API returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The body was not the JSON document we expected.
    #[error("Failed to parse response: {0}")]
    ParseFailed(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.without_url())
    }
}

impl Error {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures and every non-success status count as transient;
    /// a malformed URL or an unparseable body will not change on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::HttpStatus { .. })
    }
}
