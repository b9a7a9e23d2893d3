use chrono::DateTime;
use chrono_tz::Tz;
use scraper::{ElementRef, Html};

use super::{
    ExtractedTip, RowResult, RowSkip, TipSource, element_text, non_empty_pair,
    select_with_fallback, selector,
};
use crate::datetime_resolve::resolve_kickoff;
use crate::model::Prediction;

const BETWIZAD_URL: &str = "https://betwizad.com/premier-league/england";
const ROW_SELECTORS: &[&str] = &["table tbody tr", "tr"];
const MIN_ROW_TEXT: usize = 20;
const MIN_CELLS: usize = 4;

/// betwizad.com league tables laid out as `Date | Home | Score | Away | ... | Tip`.
pub struct BetWizad;

impl TipSource for BetWizad {
    fn key(&self) -> &'static str {
        "betwizad"
    }

    fn name(&self) -> &'static str {
        "BetWizad"
    }

    fn url(&self) -> &'static str {
        BETWIZAD_URL
    }

    fn default_accuracy(&self) -> f64 {
        65.0
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
    let text = element_text(row);
    // Header and spacer rows carry no kickoff time.
    if !text.contains(':') || text.chars().count() < MIN_ROW_TEXT {
        return Err(RowSkip::NotAFixtureRow);
    }

    let Some(td) = selector("td") else {
        return Err(RowSkip::TooFewCells(0));
    };
    let cells: Vec<String> = row.select(&td).map(|cell| element_text(&cell)).collect();
    if cells.len() < MIN_CELLS {
        return Err(RowSkip::TooFewCells(cells.len()));
    }

    let (home_team, away_team) = non_empty_pair(cells[1].clone(), cells[3].clone())?;
    let tip = cells[cells.len() - 1].clone();

    Ok(ExtractedTip {
        home_team,
        away_team,
        kickoff: resolve_kickoff(&text, now),
        prediction: prediction_from_tip(&tip),
        analysis: format!("Tip: {tip}"),
    })
}

/// Double-chance tips resolve to their first side: "1X" is home, "X2" away.
fn prediction_from_tip(tip: &str) -> Prediction {
    if tip.contains('1') {
        Prediction::Home
    } else if tip.contains('2') {
        Prediction::Away
    } else {
        Prediction::Draw
    }
}
