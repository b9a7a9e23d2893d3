use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::model::StoredMatch;
use crate::store::Store;
use crate::team_names::{names_overlap, normalize_team_name};

pub const DEFAULT_LEAGUE_NAME: &str = "International";
pub const DEFAULT_LEAGUE_COUNTRY: &str = "World";
pub const DEFAULT_MATCH_WINDOW_HOURS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    Existing,
    Created,
}

#[derive(Debug, Clone)]
pub struct ResolvedMatch {
    pub fixture: StoredMatch,
    pub resolution: Resolution,
}

/// Finds the stored fixture a scraped row refers to, creating it if needed.
///
/// Past kickoffs return `Ok(None)` and write nothing. Otherwise scheduled
/// matches within `kickoff ± window` are scanned earliest first and the
/// first one whose normalized home and away names both overlap wins; there
/// is no scoring, so two real fixtures sharing a window and a name fragment
/// will merge.
pub fn get_or_create_match(
    store: &Store,
    home_raw: &str,
    away_raw: &str,
    kickoff: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<Option<ResolvedMatch>> {
    if kickoff < now {
        return Ok(None);
    }

    let candidates = store.scheduled_matches_between(kickoff - window, kickoff + window)?;
    if let Some(existing) = find_candidate(&candidates, home_raw, away_raw) {
        debug!(
            home = home_raw,
            away = away_raw,
            matched = %existing.slug,
            "matched existing fixture"
        );
        return Ok(Some(ResolvedMatch {
            fixture: existing.clone(),
            resolution: Resolution::Existing,
        }));
    }

    let league = store.get_or_create_league(DEFAULT_LEAGUE_NAME, DEFAULT_LEAGUE_COUNTRY)?;
    let fixture = store.insert_match(league.id, home_raw, away_raw, kickoff)?;
    debug!(slug = %fixture.slug, "created fixture");
    Ok(Some(ResolvedMatch {
        fixture,
        resolution: Resolution::Created,
    }))
}

/// First candidate (in the given order) whose names overlap on both sides.
pub fn find_candidate<'a>(
    candidates: &'a [StoredMatch],
    home_raw: &str,
    away_raw: &str,
) -> Option<&'a StoredMatch> {
    let home = normalize_team_name(home_raw);
    let away = normalize_team_name(away_raw);
    candidates.iter().find(|m| {
        names_overlap(&home, &normalize_team_name(&m.home_team))
            && names_overlap(&away, &normalize_team_name(&m.away_team))
    })
}
