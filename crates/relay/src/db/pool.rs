use std::time::Duration;

use anyhow::{bail, Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

pub async fn create_pg_pool(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let connect_options = database_url
        .parse::<PgConnectOptions>()
        .context("failed to parse folio PostgreSQL connection options")?;
    ensure_postgres_tls(&connect_options)?;

    PgPoolOptions::new()
        .min_connections(config.min_connections.min(config.max_connections))
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .context("failed to connect to folio PostgreSQL")
}

pub async fn check_pool_health(pool: &PgPool) -> Result<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .context("folio PostgreSQL health check failed")?;

    Ok(())
}

fn ensure_postgres_tls(options: &PgConnectOptions) -> Result<()> {
    match options.get_ssl_mode() {
        PgSslMode::Require | PgSslMode::VerifyCa | PgSslMode::VerifyFull => Ok(()),
        mode => bail!(
            "folio PostgreSQL connection must require TLS; got sslmode={mode:?}. Set sslmode=require (or stricter)."
        ),
    }
}
