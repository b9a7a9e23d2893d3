use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

use super::{
    ExtractedTip, RowResult, RowSkip, TipSource, element_text, first_text, non_empty_pair,
    select_with_fallback,
};
use crate::datetime_resolve::{KickoffGuess, resolve_kickoff_detailed};
use crate::model::Prediction;

const FOOTBALLPREDICTIONS_URL: &str = "https://footballpredictions.com/betting-tips/";
const CARD_SELECTORS: &[&str] = &["div.prediction-card", "article"];
const TITLE_SELECTORS: &str = "h1, h2, h3, h4, .match-title";
const TIP_SELECTORS: &str = ".prediction, .tip, .pick";
// Cards rarely carry a kickoff; undated ones are parked at tomorrow 13:00.
const UNDATED_KICKOFF_HOUR: u32 = 13;

static TEAMS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9 ]{3,}) vs ([A-Za-z0-9 ]{3,})").expect("valid teams pattern")
});

/// footballpredictions.com expert cards. Outcome is keyword-spotted.
pub struct FootballPredictions;

impl TipSource for FootballPredictions {
    fn key(&self) -> &'static str {
        "footballpredictions"
    }

    fn name(&self) -> &'static str {
        "FootballPredictions.com"
    }

    fn url(&self) -> &'static str {
        FOOTBALLPREDICTIONS_URL
    }

    fn default_accuracy(&self) -> f64 {
        70.0
    }

    fn extract(&self, html: &str, now: DateTime<Tz>) -> Vec<RowResult> {
        let document = Html::parse_document(html);
        select_with_fallback(&document, CARD_SELECTORS)
            .iter()
            .map(|card| parse_card(card, now))
            .collect()
    }
}

fn parse_card(card: &ElementRef<'_>, now: DateTime<Tz>) -> RowResult {
    let text = element_text(card);

    // The heading is the tightest place to look for "A vs B"; the card body
    // tends to drag league names and prose into the capture.
    let (home, away) = first_text(card, TITLE_SELECTORS)
        .and_then(|title| split_teams(&title))
        .or_else(|| split_teams(&text))
        .ok_or(RowSkip::MissingTeams)?;
    let (home_team, away_team) = non_empty_pair(home, away)?;

    let prediction = spot_outcome(&text, first_text(card, TIP_SELECTORS).as_deref());

    let (kickoff, guess) = resolve_kickoff_detailed(&text, now);
    let kickoff = match guess {
        KickoffGuess::Fallback => tomorrow_at(now, UNDATED_KICKOFF_HOUR).unwrap_or(kickoff),
        _ => kickoff,
    };

    Ok(ExtractedTip {
        home_team,
        away_team,
        kickoff,
        prediction,
        analysis: "Expert Analysis".to_string(),
    })
}

fn split_teams(text: &str) -> Option<(String, String)> {
    let caps = TEAMS_RE.captures(text)?;
    Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
}

fn spot_outcome(text: &str, tip: Option<&str>) -> Prediction {
    let lowered = text.to_lowercase();
    if lowered.contains("home win") {
        return Prediction::Home;
    }
    if lowered.contains("away win") {
        return Prediction::Away;
    }
    if let Some(label) = tip.and_then(|t| t.trim().parse::<Prediction>().ok()) {
        return label;
    }
    Prediction::Draw
}

fn tomorrow_at(now: DateTime<Tz>, hour: u32) -> Option<DateTime<Tz>> {
    let date = (now + Duration::days(1)).date_naive();
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    now.timezone()
        .from_local_datetime(&date.and_time(time))
        .earliest()
}
