use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Which external toxicity scorer to try at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum ScorerBackend {
    /// Local ONNX model (default): no API key needed, no rate limits
    Onnx,
    /// Google Perspective API: requires PERSPECTIVE_API_KEY, 1 QPS limit
    Perspective,
    /// Skip external scoring and use the keyword scorer directly
    Keyword,
}

/// Primary-backend connection parameters and the startup retry policy.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// PostgreSQL connection URL. None means the fallback store is used from the start.
    pub database_url: Option<String>,
    /// Number of connection attempts before giving up on the primary backend.
    pub retries: u32,
    /// Delay between connection attempts.
    pub retry_delay: Duration,
    /// Per-attempt connect timeout.
    pub connect_timeout: Duration,
    /// Directory holding one JSON file per collection for the fallback store.
    pub data_dir: PathBuf,
}

pub const DEFAULT_DB_RETRIES: u32 = 3;
pub const DEFAULT_DB_RETRY_DELAY_MS: u64 = 2000;
pub const DEFAULT_DB_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_DATA_DIR: &str = "./data";

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            retries: DEFAULT_DB_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_DB_RETRY_DELAY_MS),
            connect_timeout: Duration::from_millis(DEFAULT_DB_CONNECT_TIMEOUT_MS),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl StorageSettings {
    /// True when the configured URL points at PostgreSQL.
    pub fn has_primary(&self) -> bool {
        self.database_url
            .as_deref()
            .is_some_and(|u| u.starts_with("postgres://") || u.starts_with("postgresql://"))
    }
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageSettings,
    /// Which external scorer to try (default: Onnx)
    pub scorer_backend: ScorerBackend,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    pub perspective_api_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every setting has a default, so this only fails on values that
    /// cannot be represented at all.
    pub fn load() -> Result<Self> {
        let scorer_backend = match env::var("MELLOW_SCORER").as_deref() {
            Ok("perspective") => ScorerBackend::Perspective,
            Ok("keyword") => ScorerBackend::Keyword,
            // "onnx" or unset both default to ONNX
            _ => ScorerBackend::Onnx,
        };

        let model_dir = env::var("MELLOW_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::toxicity::download::default_model_dir());

        let storage = StorageSettings {
            database_url: env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            retries: env_number("MELLOW_DB_RETRIES", DEFAULT_DB_RETRIES),
            retry_delay: Duration::from_millis(env_number(
                "MELLOW_DB_RETRY_DELAY_MS",
                DEFAULT_DB_RETRY_DELAY_MS,
            )),
            connect_timeout: Duration::from_millis(env_number(
                "MELLOW_DB_CONNECT_TIMEOUT_MS",
                DEFAULT_DB_CONNECT_TIMEOUT_MS,
            )),
            data_dir: env::var("MELLOW_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
        };

        Ok(Self {
            storage,
            scorer_backend,
            model_dir,
            perspective_api_key: env::var("PERSPECTIVE_API_KEY").unwrap_or_default(),
        })
    }

    /// Check that the Perspective API key is configured.
    pub fn require_perspective(&self) -> Result<()> {
        if self.perspective_api_key.is_empty() {
            anyhow::bail!(
                "PERSPECTIVE_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }
}

/// Parse a numeric env var, warning and using `default` when it is malformed.
fn env_number<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "Invalid numeric setting, using default");
            default
        }),
        Err(_) => default,
    }
}
