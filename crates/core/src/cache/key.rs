//! Cache key derivation for archived responses.

use std::fmt;

use crate::preferences::TargetDate;

/// Identifies one archived resource at one target date.
///
/// Serialized as `{day}-{month}-{year}-{url}` with day and month zero-padded
/// to two digits and the year written as a plain integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    day: String,
    month: String,
    year: String,
    url: String,
}

impl CacheKey {
    /// Derive the key for `url` as seen on `date`.
    pub fn new(date: &TargetDate, url: &str) -> Self {
        Self { day: date.padded_day(), month: date.padded_month(), year: date.year.to_string(), url: url.to_string() }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.day, self.month, self.year, self.url)
    }
}
