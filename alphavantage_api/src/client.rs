//! HTTP client for the Alpha Vantage query API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    query::{DailySeriesQuery, Query},
    types::DailySeriesResponse,
    Error,
};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Request timeout for every API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Alpha Vantage query API.
///
/// Each call is a single attempt; retrying is left to the caller so that the
/// backoff policy lives in one place.
pub struct Client {
    http: reqwest::Client,
    /// Base URL for the API. Defaults to [`DEFAULT_BASE_URL`].
    base_api_url: String,
    api_key: String,
}

impl Client {
    /// Creates a client for `base_url` (the production host is [`DEFAULT_BASE_URL`];
    /// tests point it at wiremock).
    pub fn with_base_url(base_url: &str, api_key: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_api_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn get_url(&self, path: &str, query: &impl Query) -> Result<Url, Error> {
        let url = Url::parse(format!("{}{}", &self.base_api_url, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            e
        })?;
        let mut url = query.add_to_url(&url);
        url.query_pairs_mut().append_pair("apikey", &self.api_key);
        Ok(url)
    }

    async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Query,
    {
        let url = self.get_url(path, query)?;
        let resp = self
            .http
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::debug!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            Error::ParseFailed(format!("{} | body: {}", e, snippet))
        })
    }

    /// Fetches the daily OHLCV series for one symbol.
    ///
    /// A 200 response that lacks the series (throttling notice, unknown
    /// symbol) is still `Ok`; inspect [`DailySeriesResponse::series`].
    pub async fn get_daily_series(&self, symbol: &str) -> Result<DailySeriesResponse, Error> {
        self.get::<DailySeriesResponse, DailySeriesQuery>(
            "/query",
            &DailySeriesQuery::new(symbol),
        )
        .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
