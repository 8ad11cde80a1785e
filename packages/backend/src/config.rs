use std::path::PathBuf;
use std::time::Duration;

use deckcycle_engine::SessionConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Set when `ENABLE_FILE_LOGS` is on
    pub log_dir: Option<PathBuf>,
    pub writer: WriterConfig,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let db_path = std::env::var("DECKCYCLE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_db_path());

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());

        let log_dir = env_bool("ENABLE_FILE_LOGS").then(|| {
            std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./logs"))
        });

        Self {
            db_path,
            log_level,
            log_dir,
            writer: WriterConfig::from_env(),
            session: SessionConfig::from_env(),
        }
    }
}

/// Retry policy for the background stat writer
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// How long shutdown waits for queued writes to land
    pub drain_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(10),
        }
    }
}

impl WriterConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            initial_backoff: Duration::from_millis(env_u64(
                "STAT_WRITER_INITIAL_BACKOFF_MS",
                defaults.initial_backoff.as_millis() as u64,
            )),
            max_backoff: Duration::from_millis(env_u64(
                "STAT_WRITER_MAX_BACKOFF_MS",
                defaults.max_backoff.as_millis() as u64,
            )),
            drain_timeout: Duration::from_millis(env_u64(
                "STAT_WRITER_DRAIN_TIMEOUT_MS",
                defaults.drain_timeout.as_millis() as u64,
            )),
        }
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deckcycle")
        .join("decks.db")
}

fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}
