use chrono::DateTime;
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

use super::{
    ExtractedTip, RowResult, RowSkip, TipSource, element_text, first_text, non_empty_pair,
    select_with_fallback, selector,
};
use crate::datetime_resolve::resolve_kickoff;
use crate::model::Prediction;

const FOREBET_URL: &str = "https://www.forebet.com/en/football-tips-and-predictions-for-today";

// Div-based listing first, then the older table layout.
const ROW_SELECTORS: &[&str] = &["div.rcnt", ".schema tr"];

static SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)").expect("valid score pattern"));

/// forebet.com daily predictions. Outcome comes from the predicted correct
/// score (or an explicit 1/X/2 label when the page shows one).
pub struct Forebet;

impl TipSource for Forebet {
    fn key(&self) -> &'static str {
        "forebet"
    }

    fn name(&self) -> &'static str {
        "Forebet"
    }

    fn url(&self) -> &'static str {
        FOREBET_URL
    }

    fn default_accuracy(&self) -> f64 {
        80.0
    }

    fn extract(&self, html: &str, now: DateTime<Tz>) -> Vec<RowResult> {
        let document = Html::parse_document(html);
        select_with_fallback(&document, ROW_SELECTORS)
            .iter()
            .map(|row| parse_row(row, now))
            .collect()
    }
}

fn parse_row(row: &ElementRef<'_>, now: DateTime<Tz>) -> RowResult {
    let (home, away) = team_names(row).ok_or(RowSkip::MissingTeams)?;
    let (home_team, away_team) = non_empty_pair(home, away)?;

    let text = element_text(row);
    let kickoff = resolve_kickoff(&text, now);

    let forecast = first_text(row, "span.forepr");
    let (prediction, analysis) = match forecast.as_deref().and_then(parse_label) {
        Some(label) => (label, format!("Forebet pick: {label}")),
        None => {
            let score = forecast
                .as_deref()
                .and_then(parse_score)
                .or_else(|| parse_score(&text));
            match score {
                Some((h, a)) => (Prediction::from_scores(h, a), format!("Correct Score: {h} - {a}")),
                None => (Prediction::Draw, "Draw predicted".to_string()),
            }
        }
    };

    Ok(ExtractedTip {
        home_team,
        away_team,
        kickoff,
        prediction,
        analysis,
    })
}

fn team_names(row: &ElementRef<'_>) -> Option<(String, String)> {
    if let (Some(home), Some(away)) = (
        first_text(row, "span.homeTeam"),
        first_text(row, "span.awayTeam"),
    ) {
        return Some((home, away));
    }

    // Fallback: team links.
    let sel = selector("a.tnm")?;
    let mut links = row.select(&sel).map(|a| element_text(&a));
    let home = links.next()?;
    let away = links.next()?;
    Some((home, away))
}

fn parse_label(raw: &str) -> Option<Prediction> {
    raw.trim().parse().ok()
}

fn parse_score(text: &str) -> Option<(u32, u32)> {
    let caps = SCORE_RE.captures(text)?;
    let home = caps[1].parse().ok()?;
    let away = caps[2].parse().ok()?;
    Some((home, away))
}
