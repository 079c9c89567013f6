use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::meta::MetaData;

/// Raw payload of a `TIME_SERIES_DAILY` call.
///
/// On success the provider fills `meta_data` and `time_series`. When it
/// refuses the call (bad symbol, throttling, maintenance) it still answers
/// HTTP 200 but the body carries one of the diagnostic fields instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailySeriesResponse {
    #[serde(rename = "Meta Data", default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
    /// Date string to raw record, in the order the provider sent them.
    ///
    /// Kept as raw JSON so neither a malformed record nor a malformed series
    /// fails the whole document; see [`DailySeriesResponse::series`].
    #[serde(rename = "Time Series (Daily)", default, skip_serializing_if = "Option::is_none")]
    pub time_series: Option<Value>,
    #[serde(rename = "Error Message", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "Note", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "Information", default, skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,
}

impl DailySeriesResponse {
    /// Provider diagnostic, checked in order: `Error Message`, `Note`, `Information`.
    pub fn diagnostic(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .or(self.note.as_deref())
            .or(self.information.as_deref())
    }

    /// The series, if present and shaped as a date-keyed object.
    pub fn series(&self) -> Option<&Map<String, Value>> {
        self.time_series.as_ref().and_then(Value::as_object)
    }

    /// Iterates the series in provider order, decoding each record lazily.
    ///
    /// Yields nothing when the series is absent or not an object.
    pub fn entries(
        &self,
    ) -> impl Iterator<Item = (&str, Result<RawDailyQuote, serde_json::Error>)> + '_ {
        self.series()
            .into_iter()
            .flat_map(|series| series.iter())
            .map(|(date, value)| (date.as_str(), RawDailyQuote::deserialize(value)))
    }
}

/// One date's record as the provider sends it: every number is a string.
///
/// Fields are optional so that an absent field can be told apart from a
/// malformed one. Extra provider fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDailyQuote {
    #[serde(rename = "1. open", default)]
    pub open: Option<String>,
    #[serde(rename = "2. high", default)]
    pub high: Option<String>,
    #[serde(rename = "3. low", default)]
    pub low: Option<String>,
    #[serde(rename = "4. close", default)]
    pub close: Option<String>,
    #[serde(rename = "5. volume", default)]
    pub volume: Option<String>,
}
