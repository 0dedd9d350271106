use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;
const DEFAULT_SESSION_EXPIRY_SECS: u64 = 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_MAX_UNPACKED_BYTES: u64 = 200 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL candidate store. `None` selects the in-process store.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on résumé jobs running at the same time.
    pub max_concurrent_jobs: usize,
    /// Sessions untouched for longer than this are swept.
    pub session_expiry: Duration,
    /// Period of the background sweep. `None` leaves only the sweep that
    /// runs on each job submission.
    pub sweep_interval: Option<Duration>,
    pub max_upload_bytes: usize,
    /// Cap on the total declared size of an archive's members.
    pub max_unpacked_bytes: u64,
    /// Parent directory for per-job scratch directories.
    pub scratch_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let sweep_secs: u64 = parse_env("SESSION_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", DEFAULT_PORT)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_concurrent_jobs: parse_env::<usize>("MAX_CONCURRENT_JOBS", DEFAULT_MAX_CONCURRENT_JOBS)?
                .max(1),
            session_expiry: Duration::from_secs(parse_env(
                "SESSION_EXPIRY_SECS",
                DEFAULT_SESSION_EXPIRY_SECS,
            )?),
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            max_unpacked_bytes: parse_env("MAX_UNPACKED_BYTES", DEFAULT_MAX_UNPACKED_BYTES)?,
            scratch_dir: std::env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
