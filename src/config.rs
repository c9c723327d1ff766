use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::filter::LevelFilter;
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://github.com";
pub const DEFAULT_CACHE_DIR: &str = ".cache/http-cache";
pub const DEFAULT_LOG_FILE: &str = "github-search-scraper.log";

/// Cache freshness while iterating on parsing logic.
pub const CACHE_TTL_DEV: Duration = Duration::from_secs(60 * 60);
/// Cache freshness for release builds.
pub const CACHE_TTL_PROD: Duration = Duration::from_secs(5 * 60);

/// Delays the pacer chooses from after every request.
pub const PACER_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(3),
];

/// Process-wide configuration, read once at startup and handed to the
/// components that need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub console_log_level: LevelFilter,
    pub file_log_level: LevelFilter,
    pub log_file: PathBuf,
    pub base_url: Url,
    pub fetcher: FetcherConfig,
}

/// Settings owned by a single [`crate::CachedFetcher`] session.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub pacer_delays: Vec<Duration>,
    pub retries: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfig {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_ttl: default_cache_ttl(),
            pacer_delays: PACER_DELAYS.to_vec(),
            retries: 0,
        }
    }
}

/// Debug builds keep responses longer so parser work does not hit the network.
pub fn default_cache_ttl() -> Duration {
    if cfg!(debug_assertions) {
        CACHE_TTL_DEV
    } else {
        CACHE_TTL_PROD
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Both log levels are mandatory; everything else has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(Error::MissingEnv(name));

        let console_log_level = parse_level("CONSOLE_LOG_LEVEL", &required("CONSOLE_LOG_LEVEL")?)?;
        let file_log_level = parse_level("FILE_LOG_LEVEL", &required("FILE_LOG_LEVEL")?)?;

        let log_file = lookup("LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        let base_url = match lookup("GITHUB_BASE_URL") {
            Some(value) => Url::parse(&value).map_err(|_| Error::InvalidEnv {
                name: "GITHUB_BASE_URL",
                value,
            })?,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };

        let mut fetcher = FetcherConfig::default();
        if let Some(dir) = lookup("CACHE_DIR") {
            fetcher.cache_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("CACHE_TTL_SECS") {
            fetcher.cache_ttl = Duration::from_secs(parse_number("CACHE_TTL_SECS", value)?);
        }
        if let Some(value) = lookup("FETCH_RETRIES") {
            fetcher.retries = parse_number("FETCH_RETRIES", value)?;
        }

        Ok(Config {
            console_log_level,
            file_log_level,
            log_file,
            base_url,
            fetcher,
        })
    }
}

/// Accepts tracing level names as well as the `WARNING` and `CRITICAL`
/// spellings used by other logging ecosystems.
fn parse_level(name: &'static str, value: &str) -> Result<LevelFilter> {
    let level = match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" => LevelFilter::TRACE,
        "DEBUG" => LevelFilter::DEBUG,
        "INFO" => LevelFilter::INFO,
        "WARN" | "WARNING" => LevelFilter::WARN,
        "ERROR" | "CRITICAL" => LevelFilter::ERROR,
        "OFF" => LevelFilter::OFF,
        _ => {
            return Err(Error::InvalidEnv {
                name,
                value: value.to_string(),
            })
        }
    };
    Ok(level)
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T> {
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|_| Error::InvalidEnv { name, value })
}
