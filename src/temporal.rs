//! Publication-time normalization.
//!
//! News sources label publication times in many shapes: relative phrases
//! (`3時間前`, `15 minutes ago`), month-day labels without a year (`5月1日`),
//! full dates with an optional time of day (`2024/5/1(水) 10:05`), bare clock
//! times (`09:00`) and ISO-8601 UTC instants from `datetime` attributes.
//! [`normalize`] maps all of them onto one JST instant relative to an explicit
//! reference time, or [`PublishedAt::Unknown`].
//!
//! # Resolution order
//!
//! Rules are tried in a fixed priority and the first one whose pattern matches
//! decides the outcome. A rule that matches but fails to produce a valid
//! instant yields `Unknown`; later rules are not consulted.
//!
//! | # | Rule | Example |
//! |---|------|---------|
//! | 1 | minutes ago | `90分前`, `5 minutes ago` |
//! | 2 | hours ago | `3時間前`, `2 hours ago` |
//! | 3 | days ago | `2日前`, `1 day ago` |
//! | 4 | month-day, reference year | `5月1日`, `5/1 09:00` |
//! | 5 | full date | `2024/05/01`, `2024-05-01 10:00`, `2024年5月1日` |
//! | 6 | clock time | `09:00` |
//! | 7 | ISO-8601 UTC | `2024-05-01T01:00:00Z` |
//!
//! Relative rules use the first run of digits in the label, so
//! `1時間30分前` is read as one minute ago (the minutes marker wins and the
//! first number is `1`). Month-day labels are never corrected for year
//! rollover.

use crate::models::{PublishedAt, jst};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static WEEKDAY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[(（][月火水木金土日][)）]").unwrap());
static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());
static MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,2})(?:月([0-9]{1,2})日|/([0-9]{1,2}))(?:\s*([0-9]{1,2}):([0-9]{2}))?$")
        .unwrap()
});
static FULL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([0-9]{4})(?:/|-|年)([0-9]{1,2})(?:/|-|月)([0-9]{1,2})日?(?:\s*([0-9]{1,2}):([0-9]{2})(?::([0-9]{2}))?)?$",
    )
    .unwrap()
});
static CLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{2})$").unwrap());
static ISO_UTC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}t[0-9]{2}:[0-9]{2}(?::[0-9]{2}(?:\.[0-9]+)?)?z$")
        .unwrap()
});

const MINUTE_MARKERS: [&str; 4] = ["分前", "minute", "min ago", "mins ago"];
const HOUR_MARKERS: [&str; 4] = ["時間前", "hour", "hr ago", "hrs ago"];
const DAY_MARKERS: [&str; 3] = ["日前", "day ago", "days ago"];

/// The label shapes understood by [`normalize`], in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    MinutesAgo,
    HoursAgo,
    DaysAgo,
    MonthDay,
    FullDate,
    ClockTime,
    IsoUtc,
}

impl Rule {
    /// Pick the first rule whose pattern matches a cleaned, lowercased label.
    pub fn detect(lower: &str) -> Option<Rule> {
        let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

        if has(&MINUTE_MARKERS) {
            Some(Rule::MinutesAgo)
        } else if has(&HOUR_MARKERS) {
            Some(Rule::HoursAgo)
        } else if has(&DAY_MARKERS) {
            Some(Rule::DaysAgo)
        } else if MONTH_DAY.is_match(lower) {
            Some(Rule::MonthDay)
        } else if FULL_DATE.is_match(lower) {
            Some(Rule::FullDate)
        } else if CLOCK.is_match(lower) {
            Some(Rule::ClockTime)
        } else if ISO_UTC.is_match(lower) {
            Some(Rule::IsoUtc)
        } else {
            None
        }
    }

    fn resolve(self, label: &str, reference: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        match self {
            Rule::MinutesAgo => reference.checked_sub_signed(Duration::try_minutes(first_number(label)?)?),
            Rule::HoursAgo => reference.checked_sub_signed(Duration::try_hours(first_number(label)?)?),
            Rule::DaysAgo => reference.checked_sub_signed(Duration::try_days(first_number(label)?)?),
            Rule::MonthDay => {
                let caps = MONTH_DAY.captures(label)?;
                let month: u32 = caps.get(1)?.as_str().parse().ok()?;
                let day: u32 = caps.get(2).or_else(|| caps.get(3))?.as_str().parse().ok()?;
                let date = NaiveDate::from_ymd_opt(reference.year(), month, day)?;
                let time = time_of_day(caps.get(4), caps.get(5), None)?;
                in_jst(date.and_time(time))
            }
            Rule::FullDate => {
                let caps = FULL_DATE.captures(label)?;
                let year: i32 = caps.get(1)?.as_str().parse().ok()?;
                let month: u32 = caps.get(2)?.as_str().parse().ok()?;
                let day: u32 = caps.get(3)?.as_str().parse().ok()?;
                let date = NaiveDate::from_ymd_opt(year, month, day)?;
                let time = time_of_day(caps.get(4), caps.get(5), caps.get(6))?;
                in_jst(date.and_time(time))
            }
            Rule::ClockTime => {
                let caps = CLOCK.captures(label)?;
                let time = time_of_day(caps.get(1), caps.get(2), None)?;
                let same_day = in_jst(reference.date_naive().and_time(time))?;
                if same_day > reference {
                    same_day.checked_sub_signed(Duration::days(1))
                } else {
                    Some(same_day)
                }
            }
            Rule::IsoUtc => {
                let body = label.trim_end_matches(['z', 'Z']);
                let naive = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(body, "%Y-%m-%dt%H:%M:%S%.f"))
                    .or_else(|_| NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M"))
                    .or_else(|_| NaiveDateTime::parse_from_str(body, "%Y-%m-%dt%H:%M"))
                    .ok()?;
                Some(Utc.from_utc_datetime(&naive).with_timezone(&jst()))
            }
        }
    }
}

/// Normalize a publication-time label against `reference`.
///
/// Never fails: anything that cannot be interpreted becomes
/// [`PublishedAt::Unknown`].
pub fn normalize(label: &str, reference: DateTime<FixedOffset>) -> PublishedAt {
    let reference = reference.with_timezone(&jst());
    let cleaned = WEEKDAY_MARKER.replace_all(label.trim(), "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return PublishedAt::Unknown;
    }

    let lower = cleaned.to_lowercase();
    let Some(rule) = Rule::detect(&lower) else {
        trace!(label = %cleaned, "no time rule matched");
        return PublishedAt::Unknown;
    };

    match rule.resolve(cleaned, reference) {
        Some(dt) => PublishedAt::At(dt),
        None => {
            trace!(label = %cleaned, ?rule, "time rule matched but did not resolve");
            PublishedAt::Unknown
        }
    }
}

/// First run of ASCII digits in `label`.
pub fn first_number(label: &str) -> Option<i64> {
    FIRST_NUMBER.find(label)?.as_str().parse().ok()
}

/// Time of day from optional captures; a missing hour or minute means midnight.
fn time_of_day(
    hour: Option<regex::Match<'_>>,
    minute: Option<regex::Match<'_>>,
    second: Option<regex::Match<'_>>,
) -> Option<NaiveTime> {
    let second: u32 = match second {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };
    match (hour, minute) {
        (Some(h), Some(m)) => {
            NaiveTime::from_hms_opt(h.as_str().parse().ok()?, m.as_str().parse().ok()?, second)
        }
        _ => NaiveTime::from_hms_opt(0, 0, 0),
    }
}

fn in_jst(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    jst().from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        jst().with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn norm(label: &str, reference: DateTime<FixedOffset>) -> String {
        normalize(label, reference).to_string()
    }

    #[test]
    fn test_minutes_ago() {
        assert_eq!(norm("90分前", at(2024, 5, 1, 10, 0)), "2024/05/01 08:30");
        assert_eq!(norm("15 minutes ago", at(2024, 5, 1, 10, 0)), "2024/05/01 09:45");
        assert_eq!(norm("5 mins ago", at(2024, 5, 1, 10, 0)), "2024/05/01 09:55");
    }

    #[test]
    fn test_hours_ago() {
        assert_eq!(norm("3時間前", at(2024, 5, 1, 10, 0)), "2024/05/01 07:00");
        assert_eq!(norm("2 Hours Ago", at(2024, 5, 1, 1, 0)), "2024/04/30 23:00");
    }

    #[test]
    fn test_days_ago() {
        assert_eq!(norm("2日前", at(2024, 5, 1, 10, 0)), "2024/04/29 10:00");
        assert_eq!(norm("1 day ago", at(2024, 3, 1, 12, 34)), "2024/02/29 12:34");
    }

    #[test]
    fn test_relative_uses_first_number_only() {
        // The minutes marker wins and only the leading "1" is read.
        assert_eq!(norm("1時間30分前", at(2024, 5, 1, 10, 0)), "2024/05/01 09:59");
    }

    #[test]
    fn test_relative_marker_without_number_is_unknown() {
        assert_eq!(norm("数分前", at(2024, 5, 1, 10, 0)), "unknown");
        assert_eq!(norm("an hour ago", at(2024, 5, 1, 10, 0)), "unknown");
    }

    #[test]
    fn test_month_day_uses_reference_year() {
        assert_eq!(norm("4月29日", at(2024, 5, 1, 10, 0)), "2024/04/29 00:00");
        assert_eq!(norm("5/1 09:00", at(2024, 5, 1, 10, 0)), "2024/05/01 09:00");
    }

    #[test]
    fn test_month_day_never_rolls_back_year() {
        // A December label read in January stays in the reference year.
        assert_eq!(norm("12月31日", at(2025, 1, 1, 0, 30)), "2025/12/31 00:00");
    }

    #[test]
    fn test_full_date_variants() {
        assert_eq!(norm("2024/05/01", at(2024, 5, 2, 0, 0)), "2024/05/01 00:00");
        assert_eq!(norm("2024-5-1 10:05", at(2024, 5, 2, 0, 0)), "2024/05/01 10:05");
        assert_eq!(norm("2024年5月1日", at(2024, 5, 2, 0, 0)), "2024/05/01 00:00");
        assert_eq!(norm("2024/5/1(水) 10:05", at(2024, 5, 2, 0, 0)), "2024/05/01 10:05");
    }

    #[test]
    fn test_full_date_with_seconds() {
        assert_eq!(norm("2024/05/01 10:05:30", at(2024, 5, 2, 0, 0)), "2024/05/01 10:05");
        assert_eq!(norm("2024-05-01 23:59:59", at(2024, 5, 2, 0, 0)), "2024/05/01 23:59");
        assert_eq!(norm("2024/05/01 10:05:75", at(2024, 5, 2, 0, 0)), "unknown");
    }

    #[test]
    fn test_invalid_full_date_is_unknown() {
        assert_eq!(norm("2024/13/40", at(2024, 5, 2, 0, 0)), "unknown");
        assert_eq!(norm("2024/05/01 25:00", at(2024, 5, 2, 0, 0)), "unknown");
    }

    #[test]
    fn test_clock_time_after_reference_rolls_back_one_day() {
        assert_eq!(norm("09:00", at(2024, 5, 1, 8, 30)), "2024/04/30 09:00");
    }

    #[test]
    fn test_clock_time_before_reference_is_same_day() {
        assert_eq!(norm("08:00", at(2024, 5, 1, 8, 30)), "2024/05/01 08:00");
        assert_eq!(norm("08:30", at(2024, 5, 1, 8, 30)), "2024/05/01 08:30");
    }

    #[test]
    fn test_iso_utc_shifts_to_jst() {
        assert_eq!(norm("2024-04-30T23:15:00Z", at(2024, 5, 1, 10, 0)), "2024/05/01 08:15");
        assert_eq!(norm("2024-05-01T01:00:00.000Z", at(2024, 5, 1, 10, 0)), "2024/05/01 10:00");
    }

    #[test]
    fn test_empty_and_unrecognized_are_unknown() {
        let reference = at(2024, 5, 1, 10, 0);
        assert_eq!(normalize("", reference), PublishedAt::Unknown);
        assert_eq!(normalize("   ", reference), PublishedAt::Unknown);
        assert_eq!(normalize("たった今", reference), PublishedAt::Unknown);
        assert_eq!(normalize("yesterday", reference), PublishedAt::Unknown);
    }

    #[test]
    fn test_rule_priority() {
        assert_eq!(Rule::detect("5/1"), Some(Rule::MonthDay));
        assert_eq!(Rule::detect("2024/05/01"), Some(Rule::FullDate));
        assert_eq!(Rule::detect("09:00"), Some(Rule::ClockTime));
        assert_eq!(Rule::detect("2024-05-01t00:00:00z"), Some(Rule::IsoUtc));
        assert_eq!(Rule::detect("3時間前"), Some(Rule::HoursAgo));
        assert_eq!(Rule::detect("headline"), None);
    }

    #[test]
    fn test_reference_in_other_offset_is_shifted() {
        let utc_reference = Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap().fixed_offset();
        assert_eq!(norm("3時間前", utc_reference), "2024/05/01 07:00");
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("約12分前"), Some(12));
        assert_eq!(first_number("分前"), None);
    }
}
