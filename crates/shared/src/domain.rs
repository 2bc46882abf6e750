use std::fmt;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fixed-width date key format shared by navigation and the remote
/// strip addressing scheme (`{base}/strip/{key}`).
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// A point in time truncated to the start of its local calendar day.
///
/// Two cursors built from any two timestamps on the same calendar day
/// compare equal; ordering is by day only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateCursor(NaiveDate);

impl DateCursor {
    pub fn new(moment: DateTime<Local>) -> Self {
        Self(moment.date_naive())
    }

    pub fn from_day(day: NaiveDate) -> Self {
        Self(day)
    }

    pub fn parse_key(key: &str) -> Result<Self, chrono::ParseError> {
        NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).map(Self)
    }

    /// The `YYYY-MM-DD` key addressing this day's strip.
    pub fn key(&self) -> String {
        self.0.format(DATE_KEY_FORMAT).to_string()
    }

    pub fn day(&self) -> NaiveDate {
        self.0
    }

    /// The previous calendar day. Saturates at the calendar's lower
    /// representation limit, which no real archive start reaches.
    pub fn pred(&self) -> Self {
        self.0.pred_opt().map_or(*self, Self)
    }

    /// The next calendar day, saturating like [`DateCursor::pred`].
    pub fn succ(&self) -> Self {
        self.0.succ_opt().map_or(*self, Self)
    }
}

impl fmt::Display for DateCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Metadata scraped out of one strip page. Ephemeral: produced per
/// fetch, never persisted.
///
/// `id` is the authoritative date key and may differ from the key that
/// was requested when the remote substitutes a fallback strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedStrip {
    pub id: String,
    pub title: String,
    pub image_url: Option<String>,
}
