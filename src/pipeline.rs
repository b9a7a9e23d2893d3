//! Sequential fetch → extract → resolve → record over every configured site.
//!
//! Failures never cross a boundary: a dead site ends only that site's pass,
//! a bad row ends only that row. Both are kept as values in the
//! [`RunReport`] instead of being swallowed. There are no retries; the next
//! scheduled run is the recovery path.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::http_client::HtmlFetcher;
use crate::match_resolver::{Resolution, get_or_create_match};
use crate::model::Source;
use crate::news::PulseNews;
use crate::sources::{ExtractedTip, RowResult, RowSkip, TipSource, select_sources};
use crate::store::{IngestRunSummary, Store};
use crate::tip_recorder::record_tip;

pub struct RunPlan {
    pub sources: Vec<Box<dyn TipSource>>,
    pub news: Option<PulseNews>,
}

impl RunPlan {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            sources: select_sources(&config.only_sources),
            news: config.news_enabled.then_some(PulseNews),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowOutcome {
    Recorded {
        home: String,
        away: String,
        created: bool,
        new_match: bool,
    },
    PastFixture {
        home: String,
        away: String,
    },
    Skipped {
        reason: RowSkip,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceOutcome {
    Completed,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
    pub rows: Vec<RowOutcome>,
}

impl SourceReport {
    fn failed(source: &str, err: &anyhow::Error) -> Self {
        Self {
            source: source.to_string(),
            outcome: SourceOutcome::Failed {
                error: format!("{err:#}"),
            },
            rows: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Completed)
    }

    pub fn tips_created(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, RowOutcome::Recorded { created: true, .. }))
            .count()
    }

    pub fn tips_existing(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, RowOutcome::Recorded { created: false, .. }))
            .count()
    }

    pub fn matches_created(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, RowOutcome::Recorded { new_match: true, .. }))
            .count()
    }

    pub fn past_fixtures(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, RowOutcome::PastFixture { .. }))
            .count()
    }

    pub fn rows_skipped(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, RowOutcome::Skipped { .. }))
            .count()
    }

    pub fn row_errors(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().filter_map(|row| match row {
            RowOutcome::Failed { error } => Some(error.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsReport {
    pub source: String,
    pub outcome: SourceOutcome,
    pub created: usize,
    pub existing: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub news: Option<NewsReport>,
}

impl RunReport {
    pub fn sources_succeeded(&self) -> usize {
        self.sources.iter().filter(|s| s.succeeded()).count()
    }

    pub fn tips_created(&self) -> usize {
        self.sources.iter().map(SourceReport::tips_created).sum()
    }

    pub fn matches_created(&self) -> usize {
        self.sources.iter().map(SourceReport::matches_created).sum()
    }

    pub fn errors(&self) -> Vec<String> {
        let mut out = Vec::new();
        for source in &self.sources {
            if let SourceOutcome::Failed { error } = &source.outcome {
                out.push(format!("{}: {error}", source.source));
            }
            for error in source.row_errors() {
                out.push(format!("{}: row failed: {error}", source.source));
            }
        }
        if let Some(news) = &self.news {
            if let SourceOutcome::Failed { error } = &news.outcome {
                out.push(format!("{}: {error}", news.source));
            }
            for error in &news.errors {
                out.push(format!("{}: article failed: {error}", news.source));
            }
        }
        out
    }
}

pub struct Pipeline<'a> {
    store: &'a Store,
    fetcher: &'a dyn HtmlFetcher,
    config: &'a IngestConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a Store, fetcher: &'a dyn HtmlFetcher, config: &'a IngestConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Only bookkeeping writes can fail the whole run; everything else lands
    /// in the report.
    pub fn run(&self, plan: &RunPlan, now: DateTime<Tz>) -> Result<RunReport> {
        let started_at = now.with_timezone(&Utc);
        let run_id = self.store.begin_ingest_run(started_at, plan.sources.len())?;
        info!(run_id, sources = plan.sources.len(), "ingest run started");

        let mut fetches = 0usize;
        let mut sources = Vec::with_capacity(plan.sources.len());
        for source in &plan.sources {
            self.pause_before_fetch(fetches);
            fetches += 1;
            sources.push(self.run_source(source.as_ref(), now));
        }

        let news = plan.news.as_ref().map(|news| {
            self.pause_before_fetch(fetches);
            self.run_news(news, now)
        });

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            sources,
            news,
        };
        self.store.finish_ingest_run(
            run_id,
            &IngestRunSummary {
                finished_at: report.finished_at,
                sources_succeeded: report.sources_succeeded(),
                tips_created: report.tips_created(),
                matches_created: report.matches_created(),
                errors: report.errors(),
            },
        )?;
        info!(
            run_id,
            succeeded = report.sources_succeeded(),
            tips_created = report.tips_created(),
            "ingest run finished"
        );
        Ok(report)
    }

    pub fn run_source(&self, source: &dyn TipSource, now: DateTime<Tz>) -> SourceReport {
        let name = source.name();
        info!(source = name, url = source.url(), "scraping");

        let html = match self.fetcher.fetch_html(source.url()) {
            Ok(html) => html,
            Err(err) => {
                warn!(source = name, "fetch failed: {err:#}");
                return SourceReport::failed(name, &err);
            }
        };

        // Sources are registered on first successful fetch only.
        let stored = match self
            .store
            .get_or_create_source(name, source.url(), source.default_accuracy())
        {
            Ok(stored) => stored,
            Err(err) => {
                warn!(source = name, "source registration failed: {err:#}");
                return SourceReport::failed(name, &err);
            }
        };

        let extracted = source.extract(&html, now);
        debug!(source = name, rows = extracted.len(), "rows extracted");

        let rows: Vec<RowOutcome> = extracted
            .into_iter()
            .map(|row| self.ingest_row(&stored, row, now))
            .collect();
        let report = SourceReport {
            source: name.to_string(),
            outcome: SourceOutcome::Completed,
            rows,
        };
        info!(
            source = name,
            created = report.tips_created(),
            existing = report.tips_existing(),
            past = report.past_fixtures(),
            skipped = report.rows_skipped(),
            "source done"
        );
        report
    }

    fn ingest_row(&self, source: &Source, row: RowResult, now: DateTime<Tz>) -> RowOutcome {
        let tip = match row {
            Ok(tip) => tip,
            Err(reason) => {
                debug!(source = %source.name, %reason, "row skipped");
                return RowOutcome::Skipped { reason };
            }
        };
        match self.record_row(source, &tip, now) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    source = %source.name,
                    home = %tip.home_team,
                    away = %tip.away_team,
                    "row failed: {err:#}"
                );
                RowOutcome::Failed {
                    error: format!("{err:#}"),
                }
            }
        }
    }

    fn record_row(&self, source: &Source, tip: &ExtractedTip, now: DateTime<Tz>) -> Result<RowOutcome> {
        let resolved = get_or_create_match(
            self.store,
            &tip.home_team,
            &tip.away_team,
            tip.kickoff.with_timezone(&Utc),
            now.with_timezone(&Utc),
            self.config.match_window,
        )?;
        let Some(resolved) = resolved else {
            return Ok(RowOutcome::PastFixture {
                home: tip.home_team.clone(),
                away: tip.away_team.clone(),
            });
        };

        let created = record_tip(
            self.store,
            &resolved.fixture,
            source,
            tip.prediction,
            &tip.analysis,
        )?;
        Ok(RowOutcome::Recorded {
            home: tip.home_team.clone(),
            away: tip.away_team.clone(),
            created,
            new_match: resolved.resolution == Resolution::Created,
        })
    }

    pub fn run_news(&self, news: &PulseNews, now: DateTime<Tz>) -> NewsReport {
        let mut report = NewsReport {
            source: news.name().to_string(),
            outcome: SourceOutcome::Completed,
            created: 0,
            existing: 0,
            skipped: 0,
            errors: Vec::new(),
        };
        info!(source = news.name(), url = news.url(), "scraping news");

        let html = match self.fetcher.fetch_html(news.url()) {
            Ok(html) => html,
            Err(err) => {
                warn!(source = news.name(), "fetch failed: {err:#}");
                report.outcome = SourceOutcome::Failed {
                    error: format!("{err:#}"),
                };
                return report;
            }
        };

        let published_at = now.with_timezone(&Utc);
        for card in news.extract(&html) {
            let article = match card {
                Ok(article) => article,
                Err(_) => {
                    report.skipped += 1;
                    continue;
                }
            };
            match self.store.insert_news_if_absent(
                &article.title,
                &article.url,
                article.image_url.as_deref(),
                news.summary(),
                news.name(),
                published_at,
            ) {
                Ok(true) => report.created += 1,
                Ok(false) => report.existing += 1,
                Err(err) => report.errors.push(format!("{err:#}")),
            }
        }
        info!(
            source = news.name(),
            created = report.created,
            existing = report.existing,
            "news done"
        );
        report
    }

    fn pause_before_fetch(&self, fetches_so_far: usize) {
        if fetches_so_far == 0 {
            return;
        }
        let jitter_ms = self.config.request_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        let pause = self.config.request_delay + jitter;
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }
}
