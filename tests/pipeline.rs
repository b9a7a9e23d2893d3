use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone};
use chrono_tz::Africa::Nairobi;
use chrono_tz::Tz;

use betting_intel::config::IngestConfig;
use betting_intel::consensus::consensus_for_match;
use betting_intel::http_client::HtmlFetcher;
use betting_intel::news::PulseNews;
use betting_intel::pipeline::{Pipeline, RowOutcome, RunPlan, SourceOutcome};
use betting_intel::sources::{BetWizad, FootballPredictions, Forebet, TipSource, default_sources};
use betting_intel::store::Store;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn nairobi(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
    Nairobi
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .expect("valid local time")
}

/// Serves canned pages by URL; anything unknown is a 404.
#[derive(Default)]
struct FakeFetcher {
    pages: HashMap<String, Result<String, String>>,
    requested: RefCell<Vec<String>>,
}

impl FakeFetcher {
    fn with_page(mut self, url: &str, fixture: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(read_fixture(fixture)));
        self
    }

    fn with_failure(mut self, url: &str, error: &str) -> Self {
        self.pages.insert(url.to_string(), Err(error.to_string()));
        self
    }

    fn all_sites() -> Self {
        Self::default()
            .with_page(Forebet.url(), "forebet_today.html")
            .with_page(BetWizad.url(), "betwizad.html")
            .with_page(FootballPredictions.url(), "footballpredictions.html")
            .with_page(PulseNews.url(), "pulse_news.html")
    }
}

impl HtmlFetcher for FakeFetcher {
    fn fetch_html(&self, url: &str) -> Result<String> {
        self.requested.borrow_mut().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(error)) => Err(anyhow!("{error}")),
            None => Err(anyhow!("http 404 Not Found from {url}")),
        }
    }
}

fn full_plan() -> RunPlan {
    RunPlan {
        sources: default_sources(),
        news: Some(PulseNews),
    }
}

fn config() -> IngestConfig {
    IngestConfig::default().without_delays()
}

#[test]
fn full_run_records_tips_and_merges_cross_site_fixtures() {
    let store = Store::in_memory().expect("store");
    let fetcher = FakeFetcher::all_sites();
    let config = config();
    let pipeline = Pipeline::new(&store, &fetcher, &config);

    let report = pipeline
        .run(&full_plan(), nairobi(2024, 11, 1, 10, 0))
        .expect("run should complete");

    assert_eq!(report.sources.len(), 3);
    assert_eq!(report.sources_succeeded(), 3);
    assert_eq!(report.tips_created(), 8);
    assert_eq!(report.matches_created(), 7);
    assert!(report.errors().is_empty());

    let betwizad = &report.sources[1];
    assert_eq!(betwizad.source, "BetWizad");
    assert_eq!(betwizad.tips_created(), 2);
    assert_eq!(betwizad.matches_created(), 1);
    assert_eq!(betwizad.rows_skipped(), 2);

    // Forebet and BetWizad both listed Arsenal v Chelsea half an hour apart.
    let fixture = store
        .match_by_slug("arsenal-fc-vs-chelsea-fc-2024-11-18")
        .expect("query")
        .expect("fixture should exist");
    let consensus = consensus_for_match(&store, fixture.id)
        .expect("consensus")
        .expect("fixture has tips");
    assert_eq!(consensus.total, 2);
    assert_eq!(consensus.home, 100.0);

    let news = report.news.as_ref().expect("news ran");
    assert_eq!(news.outcome, SourceOutcome::Completed);
    assert_eq!(news.created, 2);
    assert_eq!(news.skipped, 1);
    assert_eq!(store.latest_news(10).expect("news").len(), 2);

    assert_eq!(fetcher.requested.borrow().len(), 4);
}

#[test]
fn repeat_run_creates_nothing_new() {
    let store = Store::in_memory().expect("store");
    let fetcher = FakeFetcher::all_sites();
    let config = config();
    let pipeline = Pipeline::new(&store, &fetcher, &config);
    let now = nairobi(2024, 11, 1, 10, 0);

    pipeline.run(&full_plan(), now).expect("first run");
    let second = pipeline.run(&full_plan(), now).expect("second run");

    assert_eq!(second.tips_created(), 0);
    assert_eq!(second.matches_created(), 0);
    assert_eq!(
        second.sources.iter().map(|s| s.tips_existing()).sum::<usize>(),
        8
    );
    assert_eq!(store.match_count().expect("count"), 7);
    let news = second.news.expect("news ran");
    assert_eq!((news.created, news.existing), (0, 2));
}

#[test]
fn failing_site_does_not_stop_the_others() {
    let store = Store::in_memory().expect("store");
    let fetcher = FakeFetcher::all_sites()
        .with_failure(Forebet.url(), "http 503 Service Unavailable from forebet");
    let config = config();
    let pipeline = Pipeline::new(&store, &fetcher, &config);

    let report = pipeline
        .run(&full_plan(), nairobi(2024, 11, 1, 10, 0))
        .expect("run should complete");

    assert_eq!(report.sources_succeeded(), 2);
    assert_eq!(
        report.sources[0].outcome,
        SourceOutcome::Failed {
            error: "http 503 Service Unavailable from forebet".to_string()
        }
    );
    assert!(report.sources[0].rows.is_empty());
    assert_eq!(report.sources[1].tips_created(), 2);
    assert_eq!(report.sources[2].tips_created(), 2);

    let errors = report.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Forebet: http 503"));

    // A site that never answered is not registered.
    let names: Vec<String> = store
        .sources()
        .expect("sources")
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["FootballPredictions.com", "BetWizad"]);
}

#[test]
fn run_bookkeeping_is_persisted() {
    let store = Store::in_memory().expect("store");
    let fetcher = FakeFetcher::all_sites().with_failure(BetWizad.url(), "connection reset");
    let config = config();
    let pipeline = Pipeline::new(&store, &fetcher, &config);

    let report = pipeline
        .run(&full_plan(), nairobi(2024, 11, 1, 10, 0))
        .expect("run should complete");

    let stored = store
        .last_ingest_run()
        .expect("query")
        .expect("run row written");
    assert_eq!(stored.run_id, report.run_id);
    assert_eq!(stored.sources_total, 3);
    assert_eq!(stored.sources_succeeded, 2);
    assert_eq!(stored.tips_created, report.tips_created());
    assert_eq!(stored.matches_created, report.matches_created());
    assert!(stored.finished_at.is_some());
    assert_eq!(stored.errors, vec!["BetWizad: connection reset".to_string()]);
}

#[test]
fn past_fixtures_are_reported_not_stored() {
    let store = Store::in_memory().expect("store");
    let fetcher = FakeFetcher::all_sites();
    let config = config();
    let pipeline = Pipeline::new(&store, &fetcher, &config);
    let plan = RunPlan {
        sources: vec![Box::new(Forebet)],
        news: None,
    };

    let report = pipeline
        .run(&plan, nairobi(2024, 11, 18, 20, 0))
        .expect("run should complete");

    let forebet = &report.sources[0];
    assert_eq!(forebet.past_fixtures(), 1);
    assert_eq!(forebet.tips_created(), 3);
    assert!(forebet.rows.iter().any(|row| matches!(
        row,
        RowOutcome::PastFixture { home, .. } if home == "Arsenal FC"
    )));
    assert!(
        store
            .match_by_slug("arsenal-fc-vs-chelsea-fc-2024-11-18")
            .expect("query")
            .is_none()
    );
    assert!(report.news.is_none());
}

#[test]
fn plan_follows_config_selection() {
    let mut config = config();
    config.only_sources = vec!["forebet".to_string(), "betwizad".to_string()];
    config.news_enabled = false;
    let plan = RunPlan::from_config(&config);
    let keys: Vec<&str> = plan.sources.iter().map(|s| s.key()).collect();
    assert_eq!(keys, vec!["forebet", "betwizad"]);
    assert!(plan.news.is_none());
}

#[test]
fn news_fetch_failure_is_reported() {
    let store = Store::in_memory().expect("store");
    let fetcher = FakeFetcher::default();
    let config = config();
    let pipeline = Pipeline::new(&store, &fetcher, &config);

    let report = pipeline.run_news(&PulseNews, nairobi(2024, 11, 1, 10, 0));
    assert!(matches!(report.outcome, SourceOutcome::Failed { .. }));
    assert_eq!(report.created, 0);
}
