use anyhow::Result;
use tracing::debug;

use crate::model::{Prediction, Source, StoredMatch};
use crate::store::Store;

/// Writes the tip unless this source already has one for the match.
/// Returns true when a row was created.
pub fn record_tip(
    store: &Store,
    fixture: &StoredMatch,
    source: &Source,
    prediction: Prediction,
    analysis: &str,
) -> Result<bool> {
    let analysis = Some(analysis.trim()).filter(|s| !s.is_empty());
    let created = store.insert_tip_if_absent(fixture.id, source.id, prediction, analysis)?;
    if created {
        debug!(source = %source.name, fixture = %fixture.slug, %prediction, "tip recorded");
    }
    Ok(created)
}
