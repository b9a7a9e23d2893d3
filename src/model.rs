use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Prediction {
    #[serde(rename = "1")]
    Home,
    #[serde(rename = "X")]
    Draw,
    #[serde(rename = "2")]
    Away,
}

impl Prediction {
    pub const ALL: [Prediction; 3] = [Prediction::Home, Prediction::Draw, Prediction::Away];

    pub fn code(self) -> &'static str {
        match self {
            Prediction::Home => "1",
            Prediction::Draw => "X",
            Prediction::Away => "2",
        }
    }

    /// Higher predicted score wins; equal scores are a draw.
    pub fn from_scores(home: u32, away: u32) -> Self {
        if home > away {
            Prediction::Home
        } else if away > home {
            Prediction::Away
        } else {
            Prediction::Draw
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Prediction::Home => "Home",
            Prediction::Draw => "Draw",
            Prediction::Away => "Away",
        }
    }
}

impl FromStr for Prediction {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "1" => Ok(Prediction::Home),
            "X" | "x" => Ok(Prediction::Draw),
            "2" => Ok(Prediction::Away),
            other => Err(anyhow!("unknown prediction code {other:?}")),
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Finished,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Finished => "finished",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "finished" => Ok(MatchStatus::Finished),
            other => Err(anyhow!("unknown match status {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub url: String,
    // Manual trust signal, 0-100. Never computed by ingestion.
    pub accuracy_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMatch {
    pub id: i64,
    pub league_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub slug: String,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredTip {
    pub id: i64,
    pub match_id: i64,
    pub source_id: i64,
    pub prediction: Prediction,
    pub analysis_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsArticle {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub image_url: Option<String>,
    pub summary: Option<String>,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

/// URL-safe slug: lowercase ASCII words joined by single hyphens.
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else if ch == '-' || ch.is_whitespace() {
            pending_dash = true;
        }
    }
    out.trim_matches(|c| c == '-' || c == '_').to_string()
}

pub fn match_slug(home: &str, away: &str, start_time: DateTime<Utc>) -> String {
    slugify(&format!(
        "{home}-vs-{away}-{}",
        start_time.format("%Y-%m-%d")
    ))
}

pub fn league_slug(name: &str, country: &str) -> String {
    slugify(&format!("{country}-{name}"))
}
