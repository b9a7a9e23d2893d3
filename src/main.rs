use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use betting_intel::config::{self, IngestConfig, parse_source_keys};
use betting_intel::http_client::HttpFetcher;
use betting_intel::logging::init_tracing;
use betting_intel::pipeline::{Pipeline, RunPlan, SourceOutcome};
use betting_intel::run_lock::{RunLock, SCRAPE_LOCK};
use betting_intel::store::Store;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut config = IngestConfig::from_env();
    if let Some(path) = flag_value(&args, "--db") {
        config.db_path = Some(PathBuf::from(path));
    }
    if let Some(raw) = flag_value(&args, "--only") {
        config.only_sources = parse_source_keys(&raw);
    }
    if args.iter().any(|a| a == "--no-news") {
        config.news_enabled = false;
    }

    let db_path = config
        .db_path
        .clone()
        .or_else(config::default_db_path)
        .context("unable to resolve sqlite path")?;
    let store = Store::open(&db_path)?;

    let now = Utc::now().with_timezone(&config.timezone);
    let Some(lock) = RunLock::try_acquire(&store, SCRAPE_LOCK, config.lock_ttl, now.with_timezone(&Utc))?
    else {
        println!("Scrape already running or cooling down; nothing to do");
        return Ok(());
    };

    let plan = RunPlan::from_config(&config);
    if plan.sources.is_empty() && plan.news.is_none() {
        lock.release()?;
        println!("No sources selected");
        return Ok(());
    }

    let fetcher = HttpFetcher::new()?;
    let pipeline = Pipeline::new(&store, &fetcher, &config);
    let result = pipeline.run(&plan, now);
    // Release before surfacing a bookkeeping error so the next trigger can run.
    lock.release()?;
    let report = result?;

    println!("Scrape complete");
    println!("DB: {}", db_path.display());
    println!(
        "Sources: {}/{}",
        report.sources_succeeded(),
        report.sources.len()
    );
    println!(
        "Tips created: {} (new fixtures: {})",
        report.tips_created(),
        report.matches_created()
    );
    for source in &report.sources {
        match &source.outcome {
            SourceOutcome::Completed => println!(
                "{}: created={} existing={} past={} skipped={}",
                source.source,
                source.tips_created(),
                source.tips_existing(),
                source.past_fixtures(),
                source.rows_skipped()
            ),
            SourceOutcome::Failed { error } => println!("{}: FAILED {error}", source.source),
        }
    }
    if let Some(news) = &report.news {
        match &news.outcome {
            SourceOutcome::Completed => println!(
                "{}: articles created={} existing={} skipped={}",
                news.source, news.created, news.existing, news.skipped
            ),
            SourceOutcome::Failed { error } => println!("{}: FAILED {error}", news.source),
        }
    }
    let errors = report.errors();
    if !errors.is_empty() {
        println!("  errors: {}", errors.len());
        for err in errors.iter().take(6) {
            println!("   - {err}");
        }
    }

    Ok(())
}

/// `--flag=value` or `--flag value`.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
