use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use betting_intel::config::{self, IngestConfig};
use betting_intel::consensus::consensus_for_match;
use betting_intel::logging::init_tracing;
use betting_intel::store::Store;

const DEFAULT_LIMIT: usize = 20;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let config = IngestConfig::from_env();
    let db_path = parse_path_arg("--db")
        .or(config.db_path.clone())
        .or_else(config::default_db_path)
        .context("unable to resolve sqlite path")?;
    let limit = parse_usize_arg("--limit").unwrap_or(DEFAULT_LIMIT).max(1);
    let offset = parse_usize_arg("--offset").unwrap_or(0);

    let store = Store::open(&db_path)?;
    let matches = store.upcoming_matches(Utc::now(), limit, offset)?;
    if matches.is_empty() {
        println!("No upcoming matches");
        return Ok(());
    }

    for m in matches {
        let kickoff = m.start_time.with_timezone(&config.timezone);
        let line = match consensus_for_match(&store, m.id)? {
            Some(c) => format!(
                "1 {:>5.1}%  X {:>5.1}%  2 {:>5.1}%  ({} tips, {})",
                c.home,
                c.draw,
                c.away,
                c.total,
                c.favourite().map_or("split", |p| p.label())
            ),
            None => "no tips yet".to_string(),
        };
        println!(
            "{}  {} vs {}  {}",
            kickoff.format("%a %d %b %H:%M"),
            m.home_team,
            m.away_team,
            line
        );
    }
    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    arg_value(flag).map(PathBuf::from)
}

fn parse_usize_arg(flag: &str) -> Option<usize> {
    arg_value(flag).and_then(|v| v.parse::<usize>().ok())
}

fn arg_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
