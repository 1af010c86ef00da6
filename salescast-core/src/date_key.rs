//! DateKey: the canonical calendar-day join key shared by every series.
//!
//! A key is a plain calendar day. Timestamps are reduced to the day they
//! name in their own offset, never converted to UTC first, so a
//! late-evening record and a just-after-midnight record never drift onto
//! a neighbouring day.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ISO_DAY: &str = "%Y-%m-%d";

/// Canonical calendar day, serialized as ISO `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(NaiveDate);

#[derive(Debug, Error)]
#[error("not a calendar day: {0:?}")]
pub struct DateKeyParseError(pub String);

impl DateKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Returns `None` for an impossible calendar day.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Canonicalize a zoned timestamp to the calendar day it names locally.
    pub fn canonicalize<Tz: TimeZone>(moment: &DateTime<Tz>) -> Self {
        Self::from_naive(moment.naive_local())
    }

    /// Canonicalize a wall-clock timestamp (already local).
    pub fn from_naive(moment: NaiveDateTime) -> Self {
        Self(moment.date())
    }

    /// Lenient parse of an upstream date string.
    ///
    /// Accepts `YYYY-MM-DD` and any string starting with it followed by a
    /// `T` or space time part (`2024-03-01T23:30:00+03:00`, `2024-03-01 08:00`).
    /// The calendar day written in the string wins; the offset is not applied.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let day = raw.get(..10)?;
        match raw.as_bytes().get(10) {
            None | Some(b'T') | Some(b't') | Some(b' ') => {}
            Some(_) => return None,
        }
        NaiveDate::parse_from_str(day, ISO_DAY).ok().map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The following calendar day, or `None` at the end of the representable range.
    pub fn next_day(&self) -> Option<Self> {
        self.0.checked_add_signed(Duration::days(1)).map(Self)
    }

    /// Signed distance in days from `self` to `other`.
    pub fn days_until(&self, other: DateKey) -> i64 {
        (other.0 - self.0).num_days()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(ISO_DAY))
    }
}

impl FromStr for DateKey {
    type Err = DateKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| DateKeyParseError(s.to_string()))
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Extend `already_present` with consecutive days until it holds `horizon` keys.
///
/// The anchor is the later of `last_known` and the last element of
/// `already_present`; `today` is used only when both are absent. A sequence
/// that already reaches the horizon is returned as-is (never truncated).
pub fn extend_sequence(
    last_known: Option<DateKey>,
    horizon: usize,
    already_present: &[DateKey],
    today: DateKey,
) -> Vec<DateKey> {
    let mut keys = already_present.to_vec();
    if keys.len() >= horizon {
        return keys;
    }

    let anchor = match (last_known, keys.last().copied()) {
        (Some(known), Some(present)) => known.max(present),
        (Some(key), None) | (None, Some(key)) => key,
        (None, None) => today,
    };

    let mut cursor = anchor;
    while keys.len() < horizon {
        let Some(next) = cursor.next_day() else {
            break;
        };
        keys.push(next);
        cursor = next;
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    #[test]
    fn display_is_iso_day() {
        assert_eq!(DateKey::from_ymd(2024, 3, 1).unwrap().to_string(), "2024-03-01");
    }

    #[test]
    fn late_evening_and_early_morning_keep_their_day() {
        let moscow = FixedOffset::east_opt(3 * 3600).unwrap();
        let late = moscow.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        let early = moscow.with_ymd_and_hms(2024, 3, 1, 0, 15, 0).unwrap();
        assert_eq!(DateKey::canonicalize(&late), key("2024-03-01"));
        assert_eq!(DateKey::canonicalize(&early), key("2024-03-01"));
    }

    #[test]
    fn wall_clock_edges_stay_on_their_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let first = DateKey::from_naive(day.and_hms_opt(0, 0, 0).unwrap());
        let last = DateKey::from_naive(day.and_hms_opt(23, 59, 59).unwrap());
        assert_eq!(first, key("2024-03-01"));
        assert_eq!(last, key("2024-03-01"));
    }

    #[test]
    fn same_day_different_times_compare_equal() {
        assert_eq!(key("2024-03-01T00:00:01"), key("2024-03-01 23:59:59"));
        assert_eq!(key("2024-03-01T10:00:00+03:00"), key("2024-03-01"));
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let k = key("2024-12-31");
        let reparsed = DateKey::parse(&k.to_string()).unwrap();
        let noon = DateKey::from_naive(reparsed.date().and_hms_opt(12, 0, 0).unwrap());
        assert_eq!(reparsed, k);
        assert_eq!(noon, k);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(DateKey::parse("").is_none());
        assert!(DateKey::parse("yesterday").is_none());
        assert!(DateKey::parse("2024-02-30").is_none());
        assert!(DateKey::parse("2024-03-011").is_none());
        assert!("31.12.2024".parse::<DateKey>().is_err());
    }

    #[test]
    fn serde_uses_iso_string() {
        let json = serde_json::to_string(&key("2024-01-05")).unwrap();
        assert_eq!(json, "\"2024-01-05\"");
        let back: DateKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key("2024-01-05"));
    }

    #[test]
    fn extend_from_empty_starts_day_after_anchor() {
        let today = key("2024-06-10");
        let out = extend_sequence(Some(key("2024-02-27")), 4, &[], today);
        let rendered: Vec<String> = out.iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, ["2024-02-28", "2024-02-29", "2024-03-01", "2024-03-02"]);
    }

    #[test]
    fn extend_falls_back_to_today() {
        let today = key("2024-12-30");
        let out = extend_sequence(None, 3, &[], today);
        assert_eq!(out, vec![key("2024-12-31"), key("2025-01-01"), key("2025-01-02")]);
    }

    #[test]
    fn extend_anchors_on_later_of_known_and_present() {
        let today = key("2024-01-01");
        let present = [key("2024-01-10"), key("2024-01-11")];
        let out = extend_sequence(Some(key("2024-01-05")), 4, &present, today);
        assert_eq!(
            out,
            vec![key("2024-01-10"), key("2024-01-11"), key("2024-01-12"), key("2024-01-13")]
        );

        let out = extend_sequence(Some(key("2024-01-20")), 3, &present, today);
        assert_eq!(out[2], key("2024-01-21"));
    }

    #[test]
    fn extend_never_truncates() {
        let present: Vec<DateKey> = (1..=5).map(|d| DateKey::from_ymd(2024, 1, d).unwrap()).collect();
        let out = extend_sequence(None, 3, &present, key("2024-01-01"));
        assert_eq!(out, present);
    }

    #[test]
    fn extend_with_zero_horizon_is_identity() {
        assert!(extend_sequence(None, 0, &[], key("2024-01-01")).is_empty());
    }

    #[test]
    fn days_until_is_signed() {
        assert_eq!(key("2024-01-01").days_until(key("2024-01-08")), 7);
        assert_eq!(key("2024-01-08").days_until(key("2024-01-01")), -7);
    }
}
