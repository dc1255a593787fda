//! Per-request client preferences.
//!
//! Preferences are rebuilt for every request from whatever storage the HTTP
//! layer uses (cookies in the gateway binary). Missing or garbled values fall
//! back to the defaults below instead of failing the request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const TARGET_DAY: &str = "targetDay";
pub const TARGET_MONTH: &str = "targetMonth";
pub const TARGET_YEAR: &str = "targetYear";
pub const REPLACE_ABS_LINKS: &str = "replaceAbsLinks";
pub const FALLBACK_TO_CURRENT: &str = "fallbackToCurrent";
pub const MINIMIZE_HTML: &str = "minimizeHtml";

/// Every preference key, in the order the configuration form lists them.
pub const PREFERENCE_KEYS: [&str; 6] =
    [TARGET_DAY, TARGET_MONTH, TARGET_YEAR, REPLACE_ABS_LINKS, FALLBACK_TO_CURRENT, MINIMIZE_HTML];

const DEFAULT_DAY: u32 = 1;
const DEFAULT_MONTH: u32 = 1;
const DEFAULT_YEAR: i32 = 2005;

/// The historical date a client wants to browse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDate {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

impl Default for TargetDate {
    fn default() -> Self {
        Self { day: DEFAULT_DAY, month: DEFAULT_MONTH, year: DEFAULT_YEAR }
    }
}

impl TargetDate {
    pub fn new(day: u32, month: u32, year: i32) -> Self {
        Self { day, month, year }
    }

    /// Two-digit zero-padded day.
    pub fn padded_day(&self) -> String {
        format!("{:02}", self.day)
    }

    /// Two-digit zero-padded month.
    pub fn padded_month(&self) -> String {
        format!("{:02}", self.month)
    }

    /// `YYYYMMDD`, the date part of a Wayback timestamp.
    pub fn wayback_timestamp(&self) -> String {
        format!("{}{:02}{:02}", self.year, self.month, self.day)
    }

    /// Whether the date exists on the calendar.
    ///
    /// Invalid dates are still forwarded upstream; the archive resolves them to
    /// the closest capture on its own.
    pub fn is_calendar_date(&self) -> bool {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).is_some()
    }
}

/// Settings a client chose for how archived content is served.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPreferences {
    pub replace_abs_links: bool,
    pub fallback_to_current: bool,
    pub minimize_html: bool,
    pub target_date: TargetDate,
}

impl ClientPreferences {
    /// Build preferences from a key lookup, e.g. over request cookies.
    ///
    /// Flags are set only when the stored value is exactly `true`. Date parts
    /// accept a leading integer (`"12abc"` reads as 12) and otherwise fall back
    /// to 1 January 2005.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).is_some_and(|v| v == "true");
        let number = |key: &str| lookup(key).as_deref().and_then(parse_leading_int);

        let target_date = TargetDate {
            day: number(TARGET_DAY).and_then(|v| u32::try_from(v).ok()).unwrap_or(DEFAULT_DAY),
            month: number(TARGET_MONTH).and_then(|v| u32::try_from(v).ok()).unwrap_or(DEFAULT_MONTH),
            year: number(TARGET_YEAR).and_then(|v| i32::try_from(v).ok()).unwrap_or(DEFAULT_YEAR),
        };

        Self {
            replace_abs_links: flag(REPLACE_ABS_LINKS),
            fallback_to_current: flag(FALLBACK_TO_CURRENT),
            minimize_html: flag(MINIMIZE_HTML),
            target_date,
        }
    }

    /// Whether any post-processing of text documents was requested.
    pub fn wants_post_processing(&self) -> bool {
        self.replace_abs_links || self.minimize_html
    }
}

/// Parse the leading integer of a string, ignoring whatever trails it.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }

    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}
