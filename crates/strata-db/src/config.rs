//! Store configuration from the environment.

use std::env;
use std::time::Duration;

use crate::pool::PoolConfig;

/// Database URL used when `STRATA_DATABASE_URL` is not set.
///
/// `mode=rwc` creates the file on first use.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://strata.db?mode=rwc";

/// Store-layer configuration.
///
/// Read once at startup by the embedding service; the persistence core
/// itself never consults the environment after construction.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database URL.
    pub database_url: String,
    /// Connection pool settings.
    pub pool: PoolConfig,
}

impl StoreConfig {
    /// Load configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `STRATA_DATABASE_URL`,
    /// `STRATA_MAX_CONNECTIONS`, `STRATA_CONNECT_TIMEOUT_SECS`. A `.env`
    /// file in the working directory is honored when present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("STRATA_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let mut pool = PoolConfig::default();
        if let Some(n) = env_u32("STRATA_MAX_CONNECTIONS") {
            pool = pool.max_connections(n);
        }
        if let Some(secs) = env_u32("STRATA_CONNECT_TIMEOUT_SECS") {
            pool = pool.connect_timeout(Duration::from_secs(u64::from(secs)));
        }

        Self { database_url, pool }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            pool: PoolConfig::default(),
        }
    }
}

fn env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
