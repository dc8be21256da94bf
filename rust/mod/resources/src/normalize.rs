//! Outgoing timestamp normalization.

use ucsb_schema::timestamp;

/// How a timestamp field is rewritten before it leaves the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampSuffix {
    /// Send the value as entered.
    #[default]
    None,
    /// Mark the value as UTC with a trailing `Z`. Values that already
    /// carry `Z` or an offset are left alone.
    Zulu,
}

impl TimestampSuffix {
    pub fn apply(self, value: &str) -> String {
        match self {
            TimestampSuffix::Zulu if !timestamp::has_zone(value) => format!("{value}Z"),
            _ => value.to_string(),
        }
    }
}
