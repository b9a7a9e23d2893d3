use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, TimeZone};
use chrono_tz::Africa::Nairobi;
use chrono_tz::Tz;

use betting_intel::model::Prediction;
use betting_intel::news::PulseNews;
use betting_intel::sources::{BetWizad, FootballPredictions, Forebet, RowSkip, TipSource};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn nairobi(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
    Nairobi
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .expect("valid local time")
}

fn now() -> DateTime<Tz> {
    nairobi(2024, 11, 1, 10, 0)
}

#[test]
fn parses_forebet_listing() {
    let rows = Forebet.extract(&read_fixture("forebet_today.html"), now());
    assert_eq!(rows.len(), 5);

    let first = rows[0].as_ref().expect("first row should parse");
    assert_eq!(first.home_team, "Arsenal FC");
    assert_eq!(first.away_team, "Chelsea FC");
    assert_eq!(first.kickoff, nairobi(2024, 11, 18, 14, 30));
    assert_eq!(first.prediction, Prediction::Home);
    assert_eq!(first.analysis, "Correct Score: 2 - 0");

    let time_only = rows[1].as_ref().expect("second row should parse");
    assert_eq!(time_only.kickoff, nairobi(2024, 11, 1, 20, 0));
    assert_eq!(time_only.prediction, Prediction::Draw);

    let linked = rows[2].as_ref().expect("team links should be used");
    assert_eq!(linked.home_team, "Tusker");
    assert_eq!(linked.away_team, "Bandari");
    assert_eq!(linked.prediction, Prediction::Away);

    assert_eq!(rows[3], Err(RowSkip::MissingTeams));

    let labelled = rows[4].as_ref().expect("label row should parse");
    assert_eq!(labelled.prediction, Prediction::Away);
    assert_eq!(labelled.analysis, "Forebet pick: 2");
}

#[test]
fn forebet_falls_back_to_table_layout() {
    let rows = Forebet.extract(&read_fixture("forebet_table.html"), now());
    assert_eq!(rows.len(), 1);
    let tip = rows[0].as_ref().expect("table row should parse");
    assert_eq!(tip.home_team, "Mathare United");
    assert_eq!(tip.away_team, "Sofapaka");
    assert_eq!(tip.kickoff, nairobi(2024, 11, 22, 13, 0));
    assert_eq!(tip.prediction, Prediction::Home);
}

#[test]
fn parses_betwizad_table() {
    let rows = BetWizad.extract(&read_fixture("betwizad.html"), now());
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], Err(RowSkip::NotAFixtureRow));

    let arsenal = rows[1].as_ref().expect("fixture row should parse");
    assert_eq!(arsenal.home_team, "Arsenal");
    assert_eq!(arsenal.away_team, "Chelsea");
    assert_eq!(arsenal.kickoff, nairobi(2024, 11, 18, 15, 0));
    assert_eq!(arsenal.prediction, Prediction::Home);
    assert_eq!(arsenal.analysis, "Tip: 1");

    let everton = rows[2].as_ref().expect("fixture row should parse");
    assert_eq!(everton.prediction, Prediction::Away);

    assert_eq!(rows[3], Err(RowSkip::TooFewCells(3)));
}

#[test]
fn parses_footballpredictions_cards() {
    let rows = FootballPredictions.extract(&read_fixture("footballpredictions.html"), now());
    assert_eq!(rows.len(), 3);

    let clasico = rows[0].as_ref().expect("card should parse");
    assert_eq!(clasico.home_team, "Real Madrid");
    assert_eq!(clasico.away_team, "Barcelona");
    assert_eq!(clasico.prediction, Prediction::Home);
    assert_eq!(clasico.kickoff, nairobi(2024, 11, 1, 21, 0));
    assert_eq!(clasico.analysis, "Expert Analysis");

    let derby = rows[1].as_ref().expect("card should parse");
    assert_eq!(derby.home_team, "Inter");
    assert_eq!(derby.away_team, "Milan");
    assert_eq!(derby.prediction, Prediction::Away);
    assert_eq!(derby.kickoff, nairobi(2024, 11, 2, 13, 0));

    assert_eq!(rows[2], Err(RowSkip::MissingTeams));
}

#[test]
fn parses_pulse_news_cards() {
    let cards = PulseNews.extract(&read_fixture("pulse_news.html"));
    assert_eq!(cards.len(), 3);

    let first = cards[0].as_ref().expect("card should parse");
    assert_eq!(first.title, "Gor Mahia edge AFC Leopards in Mashemeji derby");
    assert_eq!(
        first.url,
        "https://www.pulsesports.co.ke/football/story/gor-mahia-win-mashemeji-derby"
    );
    assert_eq!(
        first.image_url.as_deref(),
        Some("https://images.pulsesports.co.ke/derby.jpg")
    );

    let second = cards[1].as_ref().expect("card should parse");
    assert_eq!(
        second.url,
        "https://www.pulsesports.co.ke/football/story/harambee-stars-squad"
    );
    assert!(second.image_url.is_none());

    assert_eq!(cards[2], Err(RowSkip::MissingLink));
}

#[test]
fn empty_pages_yield_nothing() {
    assert!(Forebet.extract("<html></html>", now()).is_empty());
    assert!(BetWizad.extract("", now()).is_empty());
    assert!(FootballPredictions.extract("<p>maintenance</p>", now()).is_empty());
    assert!(PulseNews.extract("<html></html>").is_empty());
}
