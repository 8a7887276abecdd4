use crate::error::{PulseError, Result};
use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Expression used when `--from` is omitted.
pub const DEFAULT_FROM: &str = "yesterday";

// ---------------------------------------------------------------------------
// TimeWindow
// ---------------------------------------------------------------------------

/// The `[from, to]` range an aggregation run reports on. Both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(PulseError::InvalidWindow {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            });
        }
        Ok(Self { from, to })
    }

    /// Resolve both ends in the local time zone. A missing `to` means now.
    pub fn resolve(from: Option<&str>, to: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        Self::resolve_in(&Local, from, to, now)
    }

    pub fn resolve_in<Tz: TimeZone>(
        tz: &Tz,
        from: Option<&str>,
        to: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let from = resolve_in(tz, from.unwrap_or(DEFAULT_FROM), now)?;
        let to = match to {
            Some(expr) => resolve_in(tz, expr, now)?,
            None => now,
        };
        Self::new(from, to)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.from && t <= self.to
    }
}

// ---------------------------------------------------------------------------
// Expression parsing
// ---------------------------------------------------------------------------

static RELATIVE_RE: OnceLock<Regex> = OnceLock::new();

fn relative_re() -> &'static Regex {
    RELATIVE_RE.get_or_init(|| Regex::new(r"^(\d+)([dhmw])$").unwrap())
}

/// Resolve a time expression against `now` using the local time zone.
pub fn resolve(expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    resolve_in(&Local, expr, now)
}

/// Resolve a time expression, interpreting calendar dates in `tz`.
///
/// Tried in order: empty, keywords (`now`, `yesterday`, `last week`),
/// relative `<N><unit>`, RFC3339, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS`.
/// The first form that parses wins.
pub fn resolve_in<Tz: TimeZone>(tz: &Tz, expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Ok(now);
    }
    let invalid = || PulseError::InvalidTimeFormat(expr.to_string());

    let lowered = trimmed.to_ascii_lowercase();
    match lowered.as_str() {
        "now" => return Ok(now),
        "yesterday" => return start_of_day_before(tz, now, 1).ok_or_else(invalid),
        "last week" => return start_of_day_before(tz, now, 7).ok_or_else(invalid),
        _ => {}
    }

    if let Some(t) = relative(&lowered, now) {
        return Ok(t);
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(t.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        return local_to_utc(tz, &midnight).ok_or_else(invalid);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return local_to_utc(tz, &naive).ok_or_else(invalid);
    }

    Err(invalid())
}

/// `<N><unit>` with N > 0. Anything else falls through to the absolute forms.
fn relative(expr: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = relative_re().captures(expr)?;
    let n: i64 = caps[1].parse().ok()?;
    if n <= 0 {
        return None;
    }
    let delta = match &caps[2] {
        "d" => TimeDelta::try_days(n),
        "h" => TimeDelta::try_hours(n),
        "m" => TimeDelta::try_minutes(n),
        "w" => TimeDelta::try_weeks(n),
        _ => None,
    }?;
    now.checked_sub_signed(delta)
}

fn start_of_day_before<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>, days: u64) -> Option<DateTime<Utc>> {
    let date = now
        .with_timezone(tz)
        .date_naive()
        .checked_sub_days(Days::new(days))?;
    local_to_utc(tz, &date.and_hms_opt(0, 0, 0)?)
}

/// Ambiguous local times (DST fold) take the earlier instant; times in a DST
/// gap do not exist and yield `None`.
fn local_to_utc<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap()
    }

    fn utc(expr: &str) -> Result<DateTime<Utc>> {
        resolve_in(&Utc, expr, now())
    }

    #[test]
    fn empty_and_now_resolve_to_now() {
        assert_eq!(utc("").unwrap(), now());
        assert_eq!(utc("   ").unwrap(), now());
        assert_eq!(utc("now").unwrap(), now());
        assert_eq!(utc("NOW").unwrap(), now());
    }

    #[test]
    fn keywords_snap_to_start_of_day() {
        assert_eq!(
            utc("Yesterday").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap()
        );
        assert_eq!(
            utc("last week").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn keywords_use_the_given_zone() {
        // 12:30Z is 14:30 on the same day at +02:00; midnight there is 22:00Z the day before.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let t = resolve_in(&tz, "yesterday", now()).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 13, 22, 0, 0).unwrap());
    }

    #[test]
    fn relative_durations_subtract_exactly() {
        let cases = [
            ("3d", TimeDelta::days(3)),
            ("2h", TimeDelta::hours(2)),
            ("45m", TimeDelta::minutes(45)),
            ("1w", TimeDelta::weeks(1)),
            ("10D", TimeDelta::days(10)),
        ];
        for (expr, delta) in cases {
            assert_eq!(utc(expr).unwrap(), now() - delta, "expr: {expr}");
        }
    }

    #[test]
    fn non_positive_or_malformed_relative_fails() {
        for expr in ["0d", "-1d", "abc", "d", "3y", "3 d", "1.5h", "99999999999999999999d"] {
            let err = utc(expr).unwrap_err();
            assert!(
                matches!(err, PulseError::InvalidTimeFormat(ref s) if s == expr),
                "expected InvalidTimeFormat for {expr}, got {err:?}"
            );
        }
    }

    #[test]
    fn out_of_range_relative_fails() {
        assert!(utc("9999999999999d").is_err());
    }

    #[test]
    fn rfc3339_keeps_its_offset() {
        assert_eq!(
            utc("2024-03-01T10:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
        );
        assert_eq!(
            utc("2024-03-01T10:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn plain_date_is_local_midnight() {
        assert_eq!(
            utc("2024-03-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            resolve_in(&tz, "2024-03-01", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn zoneless_datetime_is_local() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            resolve_in(&tz, "2024-03-01T09:15:00", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 14, 15, 0).unwrap()
        );
    }

    #[test]
    fn invalid_calendar_date_fails() {
        assert!(utc("2024-02-30").is_err());
        assert!(utc("2024-13-01T00:00:00").is_err());
    }

    #[test]
    fn window_defaults_to_yesterday_through_now() {
        let w = TimeWindow::resolve_in(&Utc, None, None, now()).unwrap();
        assert_eq!(w.from, Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap());
        assert_eq!(w.to, now());
    }

    #[test]
    fn window_rejects_inverted_range() {
        let err = TimeWindow::resolve_in(&Utc, Some("1h"), Some("2h"), now()).unwrap_err();
        assert!(matches!(err, PulseError::InvalidWindow { .. }));
        assert!(err.is_usage());
    }

    #[test]
    fn window_contains_is_inclusive() {
        let w = TimeWindow::resolve_in(&Utc, Some("1d"), None, now()).unwrap();
        assert!(w.contains(w.from));
        assert!(w.contains(w.to));
        assert!(!w.contains(w.from - TimeDelta::seconds(1)));
        assert!(!w.contains(w.to + TimeDelta::seconds(1)));
    }
}
