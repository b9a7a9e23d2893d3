use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::model::Prediction;
use crate::store::Store;

/// Share of tips per outcome, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Consensus {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    pub total: usize,
}

impl Consensus {
    pub fn share(&self, prediction: Prediction) -> f64 {
        match prediction {
            Prediction::Home => self.home,
            Prediction::Draw => self.draw,
            Prediction::Away => self.away,
        }
    }

    /// Keyed by outcome code ("1", "X", "2").
    pub fn as_map(&self) -> BTreeMap<&'static str, f64> {
        Prediction::ALL
            .iter()
            .map(|p| (p.code(), self.share(*p)))
            .collect()
    }

    /// The outcome with a strictly larger share than both others.
    pub fn favourite(&self) -> Option<Prediction> {
        Prediction::ALL.into_iter().find(|p| {
            Prediction::ALL
                .iter()
                .filter(|other| *other != p)
                .all(|other| self.share(*p) > self.share(*other))
        })
    }
}

/// `None` when there are no tips at all, which callers must keep distinct
/// from a 0% bucket.
pub fn compute_consensus(predictions: &[Prediction]) -> Option<Consensus> {
    let total = predictions.len();
    if total == 0 {
        return None;
    }
    let pct = |target: Prediction| {
        let count = predictions.iter().filter(|p| **p == target).count();
        (count as f64 / total as f64) * 100.0
    };
    Some(Consensus {
        home: pct(Prediction::Home),
        draw: pct(Prediction::Draw),
        away: pct(Prediction::Away),
        total,
    })
}

pub fn consensus_for_match(store: &Store, match_id: i64) -> Result<Option<Consensus>> {
    let predictions: Vec<Prediction> = store
        .tips_for_match(match_id)?
        .into_iter()
        .map(|tip| tip.prediction)
        .collect();
    Ok(compute_consensus(&predictions))
}
