//! Per-site extraction recipes.
//!
//! Every tipping site gets one [`TipSource`] implementation owning its
//! selectors and its outcome decision table. Adding a site means adding a
//! variant to [`default_sources`]; the pipeline never branches on site.

pub mod betwizad;
pub mod footballpredictions;
pub mod forebet;

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::model::Prediction;

pub use betwizad::BetWizad;
pub use footballpredictions::FootballPredictions;
pub use forebet::Forebet;

/// One fixture and prediction pulled out of a listing row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTip {
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Tz>,
    pub prediction: Prediction,
    pub analysis: String,
}

/// Why a candidate row produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowSkip {
    MissingTeams,
    EmptyTeamName,
    NotAFixtureRow,
    TooFewCells(usize),
    MissingLink,
    MissingTitle,
}

impl fmt::Display for RowSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSkip::MissingTeams => f.write_str("no team names found"),
            RowSkip::EmptyTeamName => f.write_str("team name empty after trimming"),
            RowSkip::NotAFixtureRow => f.write_str("row does not look like a fixture"),
            RowSkip::TooFewCells(n) => write!(f, "only {n} cells"),
            RowSkip::MissingLink => f.write_str("no article link"),
            RowSkip::MissingTitle => f.write_str("no article title"),
        }
    }
}

pub type RowResult = Result<ExtractedTip, RowSkip>;

pub trait TipSource {
    /// Short lowercase key used for CLI/env selection.
    fn key(&self) -> &'static str;
    /// Display name; also the stored source name.
    fn name(&self) -> &'static str;
    fn url(&self) -> &'static str;
    /// Trust score assigned when the source row is first created.
    fn default_accuracy(&self) -> f64;
    /// Never fails as a whole: each candidate row yields a tip or a skip.
    fn extract(&self, html: &str, now: DateTime<Tz>) -> Vec<RowResult>;
}

pub fn default_sources() -> Vec<Box<dyn TipSource>> {
    vec![
        Box::new(Forebet),
        Box::new(BetWizad),
        Box::new(FootballPredictions),
    ]
}

/// Registry filtered by key; an empty key list keeps every source.
pub fn select_sources(keys: &[String]) -> Vec<Box<dyn TipSource>> {
    default_sources()
        .into_iter()
        .filter(|source| keys.is_empty() || keys.iter().any(|k| k == source.key()))
        .collect()
}

pub(crate) fn selector(raw: &str) -> Option<Selector> {
    Selector::parse(raw).ok()
}

/// Elements for the first selector in `chain` that matches anything.
pub(crate) fn select_with_fallback<'a>(document: &'a Html, chain: &[&str]) -> Vec<ElementRef<'a>> {
    for raw in chain {
        let Some(sel) = selector(raw) else {
            continue;
        };
        let found: Vec<ElementRef<'a>> = document.select(&sel).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Visible text with every fragment trimmed and joined by single spaces.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn first_text(el: &ElementRef<'_>, raw_selector: &str) -> Option<String> {
    let sel = selector(raw_selector)?;
    el.select(&sel)
        .next()
        .map(|node| element_text(&node))
        .filter(|text| !text.is_empty())
}

pub(crate) fn non_empty_pair(home: String, away: String) -> Result<(String, String), RowSkip> {
    let home = home.trim().to_string();
    let away = away.trim().to_string();
    if home.is_empty() || away.is_empty() {
        return Err(RowSkip::EmptyTeamName);
    }
    Ok((home, away))
}
