use url::Url;

use super::common::Query;

/// The `function` value selecting the daily OHLCV time series.
pub const TIME_SERIES_DAILY: &str = "TIME_SERIES_DAILY";

/// Query for `function=TIME_SERIES_DAILY`.
///
/// The API key is not part of the query; the [`crate::Client`] appends it
/// last so it never leaks into logged query strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySeriesQuery {
    pub symbol: String,
}

impl DailySeriesQuery {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

impl Query for DailySeriesQuery {
    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair("function", TIME_SERIES_DAILY)
            .append_pair("symbol", &self.symbol);
        url
    }
}
