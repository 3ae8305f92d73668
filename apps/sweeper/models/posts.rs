use chrono::{DateTime, ParseError, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the v1.1 timeline, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Post {
    pub id: u64,
    /// Kept as sent by the API and parsed on demand.
    pub created_at: String,
    #[serde(default, alias = "full_text")]
    pub text: String,
}

impl Post {
    pub fn created_at_time(&self) -> Result<DateTime<Utc>, ParseError> {
        DateTime::parse_from_str(&self.created_at, CREATED_AT_FORMAT).map(|dt| dt.with_timezone(&Utc))
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Result<TimeDelta, ParseError> {
        Ok(now - self.created_at_time()?)
    }
}

pub fn format_created_at(time: DateTime<Utc>) -> String {
    time.format(CREATED_AT_FORMAT).to_string()
}
