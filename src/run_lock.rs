//! Time-boxed exclusion for ingestion runs.
//!
//! The lock lives in the store so separate processes see it. Whoever
//! triggers a run acquires it; the pipeline itself never does. A held lock
//! makes new triggers a no-op, nothing is queued. If the holder dies the
//! row stays until `expires_at`, after which the next caller takes it over.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::params;
use tracing::warn;

use crate::store::{Store, to_db_time};

pub const SCRAPE_LOCK: &str = "scrape_all";

pub struct RunLock;

impl RunLock {
    /// `Ok(None)` when another holder's lock has not expired yet.
    pub fn try_acquire<'a>(
        store: &'a Store,
        name: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<RunLockGuard<'a>>> {
        let holder = new_holder_token();
        let now_text = to_db_time(now);
        let expires_at = now + ttl;
        let changed = store
            .conn()
            .execute(
                "INSERT INTO run_locks (name, holder, acquired_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET
                     holder = excluded.holder,
                     acquired_at = excluded.acquired_at,
                     expires_at = excluded.expires_at
                 WHERE run_locks.expires_at <= ?3",
                params![name, holder, now_text, to_db_time(expires_at)],
            )
            .context("acquire run lock")?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(RunLockGuard {
            store,
            name: name.to_string(),
            holder,
            expires_at,
            released: false,
        }))
    }

    pub fn is_held(store: &Store, name: &str, now: DateTime<Utc>) -> Result<bool> {
        let held = store
            .conn()
            .prepare("SELECT 1 FROM run_locks WHERE name = ?1 AND expires_at > ?2")
            .context("prepare lock query")?
            .exists(params![name, to_db_time(now)])
            .context("query run lock")?;
        Ok(held)
    }
}

/// Releases on [`RunLockGuard::release`] or, best effort, on drop.
pub struct RunLockGuard<'a> {
    store: &'a Store,
    name: String,
    holder: String,
    expires_at: DateTime<Utc>,
    released: bool,
}

impl RunLockGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.delete_row()
    }

    // Only our own row: a takeover after expiry belongs to someone else.
    fn delete_row(&self) -> Result<()> {
        self.store
            .conn()
            .execute(
                "DELETE FROM run_locks WHERE name = ?1 AND holder = ?2",
                params![self.name, self.holder],
            )
            .context("release run lock")?;
        Ok(())
    }
}

impl Drop for RunLockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.delete_row() {
            warn!(lock = %self.name, "failed to release run lock: {err:#}");
        }
    }
}

fn new_holder_token() -> String {
    let nonce: u64 = rand::thread_rng().r#gen();
    format!("{}-{nonce:016x}", std::process::id())
}
