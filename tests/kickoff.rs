use chrono::{DateTime, Duration, TimeZone};
use chrono_tz::Africa::Nairobi;
use chrono_tz::Tz;

use betting_intel::datetime_resolve::{KickoffGuess, resolve_kickoff, resolve_kickoff_detailed};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
    Nairobi
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .expect("valid local time")
}

#[test]
fn day_month_and_time_use_current_year() {
    let now = at(2024, 11, 1, 9, 0);
    assert_eq!(resolve_kickoff("Sat 18/11 14:30", now), at(2024, 11, 18, 14, 30));
}

#[test]
fn every_day_month_pair_resolves_verbatim() {
    let now = at(2024, 3, 5, 12, 0);
    for (day, month) in [(1, 1), (9, 4), (15, 6), (30, 9), (31, 10), (28, 2)] {
        let text = format!("{day}/{month} 19:45");
        let (kickoff, guess) = resolve_kickoff_detailed(&text, now);
        assert_eq!(guess, KickoffGuess::DateTime, "{text}");
        assert_eq!(kickoff, at(2024, month, day, 19, 45), "{text}");
    }
}

#[test]
fn january_date_seen_in_december_rolls_over() {
    let now = at(2024, 12, 28, 10, 0);
    assert_eq!(resolve_kickoff("05/01 18:00", now), at(2025, 1, 5, 18, 0));
    assert_eq!(resolve_kickoff("30/12 18:00", now), at(2024, 12, 30, 18, 0));
}

#[test]
fn time_only_later_today_stays_today() {
    let now = at(2024, 11, 1, 10, 0);
    let (kickoff, guess) = resolve_kickoff_detailed("KO 14:30", now);
    assert_eq!(guess, KickoffGuess::TimeOnly);
    assert_eq!(kickoff, at(2024, 11, 1, 14, 30));
}

#[test]
fn time_only_long_past_moves_to_tomorrow() {
    let now = at(2024, 11, 1, 20, 0);
    assert_eq!(resolve_kickoff("14:30", now), at(2024, 11, 2, 14, 30));
}

#[test]
fn time_only_within_grace_stays_today() {
    let now = at(2024, 11, 1, 15, 30);
    assert_eq!(resolve_kickoff("14:30", now), at(2024, 11, 1, 14, 30));
}

#[test]
fn no_time_falls_back_to_a_day_ahead() {
    let now = at(2024, 11, 1, 10, 0);
    let (kickoff, guess) = resolve_kickoff_detailed("Arsenal vs Chelsea", now);
    assert_eq!(guess, KickoffGuess::Fallback);
    assert_eq!(kickoff, now + Duration::hours(24));
}

#[test]
fn rollover_keeps_wall_clock_across_dst_change() {
    let london: Tz = "Europe/London".parse().expect("known zone");
    // Clocks go back overnight: BST on the 26th, GMT on the 27th.
    let now = london
        .with_ymd_and_hms(2024, 10, 26, 20, 0, 0)
        .single()
        .expect("valid local time");
    let expected = london
        .with_ymd_and_hms(2024, 10, 27, 14, 30, 0)
        .single()
        .expect("valid local time");
    assert_eq!(resolve_kickoff("14:30", now), expected);
}
