mod common;
mod daily;

pub use self::common::Query;
pub use self::daily::{DailySeriesQuery, TIME_SERIES_DAILY};
