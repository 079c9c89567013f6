use serde::{Deserialize, Serialize};

/// The `"Meta Data"` block that accompanies a successful time-series payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(rename = "1. Information", default)]
    pub information: Option<String>,
    #[serde(rename = "2. Symbol", default)]
    pub symbol: Option<String>,
    #[serde(rename = "3. Last Refreshed", default)]
    pub last_refreshed: Option<String>,
    #[serde(rename = "4. Output Size", default)]
    pub output_size: Option<String>,
    #[serde(rename = "5. Time Zone", default)]
    pub time_zone: Option<String>,
}
