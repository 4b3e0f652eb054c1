// Relay server configuration.
//
// Centralizes environment variable parsing with defaults for local
// development. Unset or unparsable values fall back to the defaults.

use std::{net::SocketAddr, time::Duration};

use crate::{auth::session::DEFAULT_SESSION_TTL_DAYS, db::pool::PoolConfig};

pub const DEFAULT_SESSION_SWEEP_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Core relay server configuration.
///
/// Constructed via [`RelayConfig::from_env`] which reads environment
/// variables and falls back to development defaults.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address (host:port).
    pub listen_addr: SocketAddr,
    /// PostgreSQL connection string. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub pool: PoolConfig,
    /// Comma-separated CORS origins (or `"*"` for any).
    pub cors_origins: Option<String>,
    /// Log filter directive (e.g. `info`, `folio_relay=debug`).
    pub log_filter: String,
    pub log_format: LogFormat,
    pub session_ttl_days: i64,
    /// How often expired sessions are purged. Zero disables the sweeper.
    pub session_sweep_interval: Option<Duration>,
}

impl RelayConfig {
    /// Parse configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `FOLIO_RELAY_HOST` | `0.0.0.0` |
    /// | `FOLIO_RELAY_PORT` | `8080` |
    /// | `FOLIO_RELAY_DATABASE_URL` | *(none, in-memory store)* |
    /// | `FOLIO_RELAY_DB_MIN_CONNECTIONS` | `2` |
    /// | `FOLIO_RELAY_DB_MAX_CONNECTIONS` | `20` |
    /// | `FOLIO_RELAY_DB_ACQUIRE_TIMEOUT_SECS` | `10` |
    /// | `FOLIO_RELAY_CORS_ORIGINS` | *(none, cors.rs uses dev defaults)* |
    /// | `FOLIO_RELAY_LOG_FILTER` | `info` |
    /// | `FOLIO_RELAY_LOG_FORMAT` | `text` (`json` for structured output) |
    /// | `FOLIO_RELAY_SESSION_TTL_DAYS` | `7` |
    /// | `FOLIO_RELAY_SESSION_SWEEP_SECS` | `3600` |
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| std::env::var(key))
    }

    /// Testable constructor that accepts an environment lookup function.
    fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let parsed = |key: &str| env(key).ok().and_then(|value| value.trim().parse::<u64>().ok());

        let host = env("FOLIO_RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 =
            env("FOLIO_RELAY_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

        let database_url =
            env("FOLIO_RELAY_DATABASE_URL").ok().filter(|value| !value.trim().is_empty());

        let defaults = PoolConfig::default();
        let pool = PoolConfig {
            min_connections: parsed("FOLIO_RELAY_DB_MIN_CONNECTIONS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.min_connections),
            max_connections: parsed("FOLIO_RELAY_DB_MAX_CONNECTIONS")
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_connections),
            acquire_timeout: parsed("FOLIO_RELAY_DB_ACQUIRE_TIMEOUT_SECS")
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
        };

        let cors_origins = env("FOLIO_RELAY_CORS_ORIGINS").ok();
        let log_filter = env("FOLIO_RELAY_LOG_FILTER").unwrap_or_else(|_| "info".into());
        let log_format = match env("FOLIO_RELAY_LOG_FORMAT") {
            Ok(value) if value.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let session_ttl_days = parsed("FOLIO_RELAY_SESSION_TTL_DAYS")
            .and_then(|v| i64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_DAYS);
        let sweep_secs =
            parsed("FOLIO_RELAY_SESSION_SWEEP_SECS").unwrap_or(DEFAULT_SESSION_SWEEP_SECS);
        let session_sweep_interval = (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs));

        Self {
            listen_addr,
            database_url,
            pool,
            cors_origins,
            log_filter,
            log_format,
            session_ttl_days,
            session_sweep_interval,
        }
    }
}
