use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use chrono_tz::Tz;

const APP_DIR: &str = "betting_intel";
const DB_FILE: &str = "tips.sqlite";
const DEFAULT_TIMEZONE: Tz = chrono_tz::Africa::Nairobi;
const DEFAULT_MATCH_WINDOW_HOURS: i64 = 4;
const DEFAULT_REQUEST_DELAY_MS: i64 = 2_000;
const DEFAULT_REQUEST_JITTER_MS: i64 = 1_000;
const DEFAULT_LOCK_TTL_SECS: i64 = 3_600;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub db_path: Option<PathBuf>,
    pub timezone: Tz,
    pub match_window: ChronoDuration,
    pub request_delay: Duration,
    pub request_jitter: Duration,
    pub lock_ttl: ChronoDuration,
    pub only_sources: Vec<String>,
    pub news_enabled: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            timezone: DEFAULT_TIMEZONE,
            match_window: ChronoDuration::hours(DEFAULT_MATCH_WINDOW_HOURS),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS as u64),
            request_jitter: Duration::from_millis(DEFAULT_REQUEST_JITTER_MS as u64),
            lock_ttl: ChronoDuration::seconds(DEFAULT_LOCK_TTL_SECS),
            only_sources: Vec::new(),
            news_enabled: true,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        let db_path = env::var("TIPS_DB_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let timezone = env::var("TIPS_TIMEZONE")
            .ok()
            .and_then(|raw| parse_timezone(&raw))
            .unwrap_or(DEFAULT_TIMEZONE);
        let window_hours = env_i64_clamped(
            "TIPS_MATCH_WINDOW_HOURS",
            DEFAULT_MATCH_WINDOW_HOURS,
            1,
            24,
        );
        let delay_ms = env_i64_clamped("TIPS_REQUEST_DELAY_MS", DEFAULT_REQUEST_DELAY_MS, 0, 30_000);
        let jitter_ms =
            env_i64_clamped("TIPS_REQUEST_JITTER_MS", DEFAULT_REQUEST_JITTER_MS, 0, 10_000);
        let lock_ttl_secs = env_i64_clamped("TIPS_LOCK_TTL_SECS", DEFAULT_LOCK_TTL_SECS, 60, 86_400);
        let only_sources = env::var("TIPS_ONLY_SOURCES")
            .map(|raw| parse_source_keys(&raw))
            .unwrap_or_default();

        Self {
            db_path,
            timezone,
            match_window: ChronoDuration::hours(window_hours),
            request_delay: Duration::from_millis(delay_ms as u64),
            request_jitter: Duration::from_millis(jitter_ms as u64),
            lock_ttl: ChronoDuration::seconds(lock_ttl_secs),
            only_sources,
            news_enabled: env_bool("TIPS_NEWS_ENABLED", true),
        }
    }

    /// No pauses between requests; for offline runs and tests.
    pub fn without_delays(mut self) -> Self {
        self.request_delay = Duration::ZERO;
        self.request_jitter = Duration::ZERO;
        self
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

pub fn parse_timezone(raw: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<Tz>().ok()
}

/// Comma/semicolon/space separated source keys, lowercased and deduped.
pub fn parse_source_keys(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split([',', ';', ' ']) {
        let key = part.trim().to_ascii_lowercase();
        if !key.is_empty() && !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

fn env_i64_clamped(key: &str, default: i64, min: i64, max: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}
