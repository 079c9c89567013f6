mod meta;
pub use self::meta::MetaData;

mod daily;
pub use self::daily::{DailySeriesResponse, RawDailyQuote};
