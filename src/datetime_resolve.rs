//! Kickoff inference from free-text listing rows.
//!
//! Listing markup rarely carries a machine-readable timestamp, so the row
//! text is scanned for the most specific pattern available:
//!
//! 1. `D/M HH:MM` on the current year (a January date seen in December rolls
//!    into next year),
//! 2. bare `HH:MM` today, pushed to tomorrow when it is more than two hours
//!    in the past,
//! 3. otherwise now + 24h.
//!
//! This never fails. False positives are accepted in exchange for surviving
//! markup changes.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})/(\d{1,2})\s+(\d{1,2}):(\d{2})").expect("valid date-time pattern")
});
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("valid time pattern"));

const PAST_GRACE_HOURS: i64 = 2;
const FALLBACK_HOURS: i64 = 24;

/// Which rule produced a kickoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickoffGuess {
    DateTime,
    TimeOnly,
    Fallback,
}

pub fn resolve_kickoff(text: &str, now: DateTime<Tz>) -> DateTime<Tz> {
    resolve_kickoff_detailed(text, now).0
}

pub fn resolve_kickoff_detailed(text: &str, now: DateTime<Tz>) -> (DateTime<Tz>, KickoffGuess) {
    if let Some(kickoff) = from_date_and_time(text, &now) {
        return (kickoff, KickoffGuess::DateTime);
    }
    if let Some(kickoff) = from_time_only(text, &now) {
        return (kickoff, KickoffGuess::TimeOnly);
    }
    (now + Duration::hours(FALLBACK_HOURS), KickoffGuess::Fallback)
}

fn from_date_and_time(text: &str, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    DATE_TIME_RE.captures_iter(text).find_map(|caps| {
        let day = caps[1].parse::<u32>().ok()?;
        let month = caps[2].parse::<u32>().ok()?;
        let hour = caps[3].parse::<u32>().ok()?;
        let minute = caps[4].parse::<u32>().ok()?;

        let mut year = now.year();
        if now.month() == 12 && month == 1 {
            year += 1;
        }

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        localize(&now.timezone(), date.and_time(time))
    })
}

fn from_time_only(text: &str, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let time = TIME_RE.captures_iter(text).find_map(|caps| {
        let hour = caps[1].parse::<u32>().ok()?;
        let minute = caps[2].parse::<u32>().ok()?;
        NaiveTime::from_hms_opt(hour, minute, 0)
    })?;

    let today = now.date_naive();
    let kickoff = localize(&now.timezone(), today.and_time(time))?;
    if kickoff < *now - Duration::hours(PAST_GRACE_HOURS) {
        // Today's slot has long passed; the listing means the same wall-clock
        // time tomorrow, which is not always 24h later.
        let tomorrow = today.succ_opt()?;
        return localize(&now.timezone(), tomorrow.and_time(time));
    }
    Some(kickoff)
}

// Ambiguous local times take the earlier instant; skipped ones yield None.
fn localize(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest()
}
