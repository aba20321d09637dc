//! Normalization helpers for free-text survey fields.
//!
//! Every function here is total: malformed input degrades to a documented
//! default instead of an error, so a submission is never rejected because
//! of how the store owner typed their opening hours.

use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

use crate::types::BusinessHours;

/// Opening time used when the hours text cannot be parsed.
pub const DEFAULT_OPEN: &str = "09:00:00";
/// Closing time used when the hours text has no recognizable range.
pub const DEFAULT_CLOSE: &str = "18:00:00";

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,2}):([0-9]{2})(?::([0-9]{2}))?$").expect("valid clock regex")
});
static COMPACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,2})([0-9]{2})$").expect("valid compact regex"));
static HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,2})$").expect("valid hour regex"));
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^~-]+)[~-]([^~-]+)").expect("valid range regex"));
static FIRST_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([0-9]{1,2}:?[0-9]{2}(?::[0-9]{2})?)[~-]([0-9]{1,2}:?[0-9]{2}(?::[0-9]{2})?)",
    )
    .expect("valid first-range regex")
});
static REGION_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,/|\s]+").expect("valid region regex"));

/// Splits a comma- or newline-separated field into trimmed, non-empty items.
///
/// Returns `None` for absent or empty input, and also when nothing survives
/// trimming, so callers never see an empty list.
#[must_use]
pub fn to_list(s: Option<&str>) -> Option<Vec<String>> {
    let s = s.filter(|s| !s.is_empty())?;
    let items: Vec<String> = s
        .split([',', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Normalizes a clock time to zero-padded `HH:MM:SS`.
///
/// Accepts `H`/`HH`, `H:MM`/`HH:MM`, `HH:MM:SS` and compact `HMM`/`HHMM`.
/// Hours clamp to 23, minutes and seconds to 59. Anything else, including
/// `None`, yields [`DEFAULT_OPEN`].
#[must_use]
pub fn norm_time(t: Option<&str>) -> String {
    let Some(t) = t else {
        return DEFAULT_OPEN.to_string();
    };

    if let Some(caps) = CLOCK_RE.captures(t) {
        let seconds = caps.get(3).map_or("0", |m| m.as_str());
        return clamp_hms(&caps[1], &caps[2], seconds);
    }
    if let Some(caps) = COMPACT_RE.captures(t) {
        return clamp_hms(&caps[1], &caps[2], "0");
    }
    if let Some(caps) = HOUR_RE.captures(t) {
        return clamp_hms(&caps[1], "0", "0");
    }
    DEFAULT_OPEN.to_string()
}

fn clamp_hms(hours: &str, minutes: &str, seconds: &str) -> String {
    let component = |raw: &str, max: u32| raw.parse::<u32>().map_or(0, |v| v.min(max));
    NaiveTime::from_hms_opt(
        component(hours, 23),
        component(minutes, 59),
        component(seconds, 59),
    )
    .map_or_else(
        || DEFAULT_OPEN.to_string(),
        |t| t.format("%H:%M:%S").to_string(),
    )
}

/// Parses an opening-hours range such as `"09:00~18:00"` or `"0900-1830"`.
///
/// Whitespace is removed first; the first `~` or `-` separated pair is fed
/// to [`norm_time`]. Without a recognizable pair both bounds fall back to
/// [`DEFAULT_OPEN`] / [`DEFAULT_CLOSE`].
#[must_use]
pub fn parse_time_range(s: Option<&str>) -> BusinessHours {
    let cleaned: String = s
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    match RANGE_RE.captures(&cleaned) {
        Some(caps) => BusinessHours {
            open: norm_time(Some(&caps[1])),
            close: norm_time(Some(&caps[2])),
        },
        None => BusinessHours::default(),
    }
}

/// Pulls the first clock-like range out of free text.
///
/// `"09:00 ~ 18:00 (break 15-17)"` becomes `"09:00-18:00"`. Text without
/// such a range is returned unchanged so [`parse_time_range`] can still
/// apply its own fallback.
#[must_use]
pub fn extract_first_time_range(s: &str) -> String {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    match FIRST_RANGE_RE.captures(&cleaned) {
        Some(caps) => format!("{}-{}", &caps[1], &caps[2]),
        None => s.to_string(),
    }
}

/// Splits a region keyword field on commas, slashes, pipes, or whitespace.
#[must_use]
pub fn split_region_keywords(s: &str) -> Vec<String> {
    REGION_SPLIT_RE
        .split(s)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Drops one leading `@` from a social handle.
#[must_use]
pub fn strip_handle(handle: &str) -> String {
    let trimmed = handle.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed).to_string()
}
