use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::model::{
    League, MatchStatus, NewsArticle, Prediction, Source, StoredMatch, StoredTip, league_slug,
    match_slug,
};

const MATCH_COLUMNS: &str =
    "id, league_id, home_team, away_team, start_time, slug, status";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        let store = Store { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let store = Store { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                PRAGMA journal_mode = WAL;
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS leagues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    country TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE
                );

                CREATE TABLE IF NOT EXISTS sources (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    url TEXT NOT NULL,
                    accuracy_score REAL NOT NULL DEFAULT 0.0
                );

                CREATE TABLE IF NOT EXISTS matches (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    league_id INTEGER NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                    home_team TEXT NOT NULL,
                    away_team TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    status TEXT NOT NULL DEFAULT 'scheduled',
                    UNIQUE(home_team, away_team, start_time)
                );
                CREATE INDEX IF NOT EXISTS idx_matches_start_time ON matches(start_time);

                CREATE TABLE IF NOT EXISTS tips (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    match_id INTEGER NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
                    source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
                    prediction TEXT NOT NULL,
                    analysis_text TEXT NULL,
                    UNIQUE(match_id, source_id)
                );
                CREATE INDEX IF NOT EXISTS idx_tips_match ON tips(match_id);

                CREATE TABLE IF NOT EXISTS news_articles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    url TEXT NOT NULL UNIQUE,
                    image_url TEXT NULL,
                    summary TEXT NULL,
                    source TEXT NOT NULL,
                    published_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_news_published ON news_articles(published_at);

                CREATE TABLE IF NOT EXISTS ingest_runs (
                    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    started_at TEXT NOT NULL,
                    finished_at TEXT NULL,
                    sources_total INTEGER NOT NULL,
                    sources_succeeded INTEGER NOT NULL,
                    tips_created INTEGER NOT NULL,
                    matches_created INTEGER NOT NULL,
                    errors_json TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS run_locks (
                    name TEXT PRIMARY KEY,
                    holder TEXT NOT NULL,
                    acquired_at TEXT NOT NULL,
                    expires_at TEXT NOT NULL
                );
                "#,
            )
            .context("create sqlite schema")?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Leagues / sources
    // ---------------------------------------------------------------------

    pub fn get_or_create_league(&self, name: &str, country: &str) -> Result<League> {
        let existing = self
            .conn
            .query_row(
                "SELECT id, name, country, slug FROM leagues WHERE name = ?1 ORDER BY id LIMIT 1",
                params![name],
                league_from_row,
            )
            .optional()
            .context("query league")?;
        if let Some(league) = existing {
            return Ok(league);
        }

        let slug = self.unique_slug("leagues", &league_slug(name, country))?;
        self.conn
            .execute(
                "INSERT INTO leagues (name, country, slug) VALUES (?1, ?2, ?3)",
                params![name, country, slug],
            )
            .context("insert league")?;
        Ok(League {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            country: country.to_string(),
            slug,
        })
    }

    /// `url` and `accuracy_score` only apply when the source is first created.
    pub fn get_or_create_source(&self, name: &str, url: &str, accuracy_score: f64) -> Result<Source> {
        self.conn
            .execute(
                "INSERT INTO sources (name, url, accuracy_score) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO NOTHING",
                params![name, url, accuracy_score.clamp(0.0, 100.0)],
            )
            .context("insert source")?;
        self.conn
            .query_row(
                "SELECT id, name, url, accuracy_score FROM sources WHERE name = ?1",
                params![name],
                source_from_row,
            )
            .context("query source")
    }

    /// Registered sources, most trusted first.
    pub fn sources(&self) -> Result<Vec<Source>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, url, accuracy_score FROM sources
                 ORDER BY accuracy_score DESC, name ASC",
            )
            .context("prepare sources query")?;
        let rows = stmt.query_map([], source_from_row).context("query sources")?;
        collect_rows(rows, "decode source row")
    }

    // ---------------------------------------------------------------------
    // Matches
    // ---------------------------------------------------------------------

    /// Scheduled matches kicking off within `[from, to]`, earliest first.
    pub fn scheduled_matches_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredMatch>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE status = 'scheduled' AND start_time >= ?1 AND start_time <= ?2
             ORDER BY start_time ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare window query")?;
        let rows = stmt
            .query_map(params![to_db_time(from), to_db_time(to)], match_from_row)
            .context("query window matches")?;
        collect_rows(rows, "decode match row")
    }

    /// Inserts a scheduled match. An identical (home, away, start_time) row is
    /// returned as-is instead of failing the unique constraint.
    ///
    /// The existence check, slug probe and insert share one transaction so a
    /// second writer cannot take the slug in between.
    pub fn insert_match(
        &self,
        league_id: i64,
        home_team: &str,
        away_team: &str,
        start_time: DateTime<Utc>,
    ) -> Result<StoredMatch> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin match transaction")?;
        let start = to_db_time(start_time);
        if let Some(existing) = self.match_by_teams_and_time(home_team, away_team, &start)? {
            return Ok(existing);
        }

        let slug = self.unique_slug("matches", &match_slug(home_team, away_team, start_time))?;
        tx.execute(
            "INSERT INTO matches (league_id, home_team, away_team, start_time, slug, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                league_id,
                home_team,
                away_team,
                start,
                slug,
                MatchStatus::Scheduled.as_str()
            ],
        )
        .context("insert match")?;
        let id = tx.last_insert_rowid();
        tx.commit().context("commit match transaction")?;
        Ok(StoredMatch {
            id,
            league_id,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            start_time: parse_db_time(&start)?,
            slug,
            status: MatchStatus::Scheduled,
        })
    }

    pub fn match_by_slug(&self, slug: &str) -> Result<Option<StoredMatch>> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE slug = ?1");
        self.conn
            .query_row(&sql, params![slug], match_from_row)
            .optional()
            .context("query match by slug")
    }

    fn match_by_teams_and_time(
        &self,
        home_team: &str,
        away_team: &str,
        start: &str,
    ) -> Result<Option<StoredMatch>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE home_team = ?1 AND away_team = ?2 AND start_time = ?3"
        );
        self.conn
            .query_row(&sql, params![home_team, away_team, start], match_from_row)
            .optional()
            .context("query match by teams")
    }

    /// Scheduled matches from `now` onwards, for listing pages.
    pub fn upcoming_matches(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMatch>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE status = 'scheduled' AND start_time >= ?1
             ORDER BY start_time ASC, id ASC
             LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare upcoming query")?;
        let rows = stmt
            .query_map(
                params![to_db_time(now), limit as i64, offset as i64],
                match_from_row,
            )
            .context("query upcoming matches")?;
        collect_rows(rows, "decode match row")
    }

    pub fn match_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))
            .context("count matches")?;
        Ok(count as usize)
    }

    /// Ingestion never calls this; results are settled by an operator.
    pub fn mark_match_finished(&self, match_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE matches SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![
                    MatchStatus::Finished.as_str(),
                    match_id,
                    MatchStatus::Scheduled.as_str()
                ],
            )
            .context("update match status")?;
        Ok(changed > 0)
    }

    // ---------------------------------------------------------------------
    // Tips
    // ---------------------------------------------------------------------

    /// Returns true when a new tip row was written.
    pub fn insert_tip_if_absent(
        &self,
        match_id: i64,
        source_id: i64,
        prediction: Prediction,
        analysis_text: Option<&str>,
    ) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO tips (match_id, source_id, prediction, analysis_text)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(match_id, source_id) DO NOTHING",
                params![match_id, source_id, prediction.code(), analysis_text],
            )
            .context("insert tip")?;
        Ok(inserted > 0)
    }

    pub fn tips_for_match(&self, match_id: i64) -> Result<Vec<StoredTip>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, match_id, source_id, prediction, analysis_text
                 FROM tips WHERE match_id = ?1 ORDER BY id ASC",
            )
            .context("prepare tips query")?;
        let rows = stmt
            .query_map(params![match_id], |row| {
                Ok(StoredTip {
                    id: row.get(0)?,
                    match_id: row.get(1)?,
                    source_id: row.get(2)?,
                    prediction: text_column(row, 3, |raw| raw.parse())?,
                    analysis_text: row.get(4)?,
                })
            })
            .context("query tips")?;
        collect_rows(rows, "decode tip row")
    }

    pub fn tip_count(&self, match_id: i64, source_id: i64) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM tips WHERE match_id = ?1 AND source_id = ?2",
                params![match_id, source_id],
                |row| row.get(0),
            )
            .context("count tips")?;
        Ok(count as usize)
    }

    // ---------------------------------------------------------------------
    // News
    // ---------------------------------------------------------------------

    /// Get-or-create keyed by URL; returns true when the article is new.
    pub fn insert_news_if_absent(
        &self,
        title: &str,
        url: &str,
        image_url: Option<&str>,
        summary: &str,
        source: &str,
        published_at: DateTime<Utc>,
    ) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO news_articles (title, url, image_url, summary, source, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(url) DO NOTHING",
                params![
                    title,
                    url,
                    image_url,
                    summary,
                    source,
                    to_db_time(published_at)
                ],
            )
            .context("insert news article")?;
        Ok(inserted > 0)
    }

    pub fn latest_news(&self, limit: usize) -> Result<Vec<NewsArticle>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, url, image_url, summary, source, published_at
                 FROM news_articles ORDER BY published_at DESC, id DESC LIMIT ?1",
            )
            .context("prepare news query")?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(NewsArticle {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    url: row.get(2)?,
                    image_url: row.get(3)?,
                    summary: row.get(4)?,
                    source: row.get(5)?,
                    published_at: text_column(row, 6, parse_db_time)?,
                })
            })
            .context("query news")?;
        collect_rows(rows, "decode news row")
    }

    // ---------------------------------------------------------------------
    // Run bookkeeping
    // ---------------------------------------------------------------------

    pub fn begin_ingest_run(&self, started_at: DateTime<Utc>, sources_total: usize) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO ingest_runs(started_at, finished_at, sources_total, sources_succeeded, tips_created, matches_created, errors_json)
                 VALUES (?1, NULL, ?2, 0, 0, 0, '[]')",
                params![to_db_time(started_at), sources_total as i64],
            )
            .context("insert ingest run")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn finish_ingest_run(&self, run_id: i64, summary: &IngestRunSummary) -> Result<()> {
        let errors_json =
            serde_json::to_string(&summary.errors).unwrap_or_else(|_| "[]".to_string());
        self.conn
            .execute(
                "UPDATE ingest_runs
                 SET finished_at = ?1, sources_succeeded = ?2, tips_created = ?3, matches_created = ?4, errors_json = ?5
                 WHERE run_id = ?6",
                params![
                    to_db_time(summary.finished_at),
                    summary.sources_succeeded as i64,
                    summary.tips_created as i64,
                    summary.matches_created as i64,
                    errors_json,
                    run_id
                ],
            )
            .context("update ingest run")?;
        Ok(())
    }

    pub fn last_ingest_run(&self) -> Result<Option<StoredIngestRun>> {
        self.conn
            .query_row(
                "SELECT run_id, started_at, finished_at, sources_total, sources_succeeded, tips_created, matches_created, errors_json
                 FROM ingest_runs ORDER BY run_id DESC LIMIT 1",
                [],
                |row| {
                    let errors_json: String = row.get(7)?;
                    Ok(StoredIngestRun {
                        run_id: row.get(0)?,
                        started_at: text_column(row, 1, parse_db_time)?,
                        finished_at: row
                            .get::<_, Option<String>>(2)?
                            .and_then(|raw| parse_db_time(&raw).ok()),
                        sources_total: row.get::<_, i64>(3)? as usize,
                        sources_succeeded: row.get::<_, i64>(4)? as usize,
                        tips_created: row.get::<_, i64>(5)? as usize,
                        matches_created: row.get::<_, i64>(6)? as usize,
                        errors: serde_json::from_str(&errors_json).unwrap_or_default(),
                    })
                },
            )
            .optional()
            .context("query last ingest run")
    }

    fn unique_slug(&self, table: &'static str, base: &str) -> Result<String> {
        let base = if base.is_empty() { "item" } else { base };
        let sql = format!("SELECT 1 FROM {table} WHERE slug = ?1");
        let mut stmt = self.conn.prepare(&sql).context("prepare slug query")?;
        let mut candidate = base.to_string();
        let mut suffix = 2u32;
        while stmt.exists(params![candidate]).context("query slug")? {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        Ok(candidate)
    }
}

#[derive(Debug, Clone)]
pub struct IngestRunSummary {
    pub finished_at: DateTime<Utc>,
    pub sources_succeeded: usize,
    pub tips_created: usize,
    pub matches_created: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StoredIngestRun {
    pub run_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub sources_total: usize,
    pub sources_succeeded: usize,
    pub tips_created: usize,
    pub matches_created: usize,
    pub errors: Vec<String>,
}

// Fixed-width UTC text so lexical order matches chronological order.
pub(crate) fn to_db_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub(crate) fn parse_db_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid stored timestamp {raw:?}"))
}

fn text_column<T, F>(row: &Row<'_>, idx: usize, parse: F) -> rusqlite::Result<T>
where
    F: FnOnce(&str) -> Result<T>,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into()))
}

fn league_from_row(row: &Row<'_>) -> rusqlite::Result<League> {
    Ok(League {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        slug: row.get(3)?,
    })
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<Source> {
    Ok(Source {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        accuracy_score: row.get(3)?,
    })
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMatch> {
    Ok(StoredMatch {
        id: row.get(0)?,
        league_id: row.get(1)?,
        home_team: row.get(2)?,
        away_team: row.get(3)?,
        start_time: text_column(row, 4, parse_db_time)?,
        slug: row.get(5)?,
        status: text_column(row, 6, |raw| raw.parse())?,
    })
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
    what: &'static str,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context(what)?);
    }
    Ok(out)
}
