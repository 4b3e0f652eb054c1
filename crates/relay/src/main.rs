mod api;
mod auth;
mod config;
mod cors;
mod db;
mod directory;
mod documents;
mod error;
mod gate;
mod store;
mod sync;
mod validation;

use std::{sync::Arc, time::Duration, time::Instant};

use anyhow::Context;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use folio_common::protocol::rest::ROUTE_HEALTH;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    api::ApiState,
    auth::session::SessionPolicy,
    config::{LogFormat, RelayConfig},
    db::{
        migrations::run_migrations,
        pool::{check_pool_health, create_pg_pool},
    },
    error::{
        attach_request_id_header, request_id_from_headers_or_generate, with_request_id_scope,
        ErrorCode, RelayError,
    },
    store::Store,
    sync::YrsDocumentSync,
    validation::MAX_REST_BODY_BYTES,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::from_env();
    init_tracing(&config);

    let store = open_store(&config).await?;
    let state = ApiState::new(
        store.clone(),
        Arc::new(YrsDocumentSync::new()),
        SessionPolicy::with_ttl_days(config.session_ttl_days),
    );

    if let Some(interval) = config.session_sweep_interval {
        tokio::spawn(sweep_expired_sessions(store, interval));
    }

    let app = build_router(api::router(state))
        .layer(cors::cors_layer(config.cors_origins.as_deref()));

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind relay listener on {}", config.listen_addr))?;

    info!(listen_addr = %config.listen_addr, "starting folio relay");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("relay server exited unexpectedly")
}

fn init_tracing(config: &RelayConfig) {
    let filter =
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn open_store(config: &RelayConfig) -> anyhow::Result<Store> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("FOLIO_RELAY_DATABASE_URL is not set; using the in-memory store");
        return Ok(Store::memory());
    };

    let pool = create_pg_pool(database_url, config.pool.clone())
        .await
        .context("failed to initialize relay PostgreSQL pool")?;
    check_pool_health(&pool).await.context("relay PostgreSQL health check failed")?;
    run_migrations(&pool).await?;

    let store = Store::Postgres(pool);
    info!(backend = store.backend_name(), "store ready");
    Ok(store)
}

async fn sweep_expired_sessions(store: Store, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match store.purge_expired_sessions(Utc::now()).await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "expired sessions purged"),
            Err(error) => warn!(error = ?error, "expired session sweep failed"),
        }
    }
}

fn build_router(api_router: Router) -> Router {
    apply_middleware(Router::new().route(ROUTE_HEALTH, get(healthz)).merge(api_router))
}

fn apply_middleware(router: Router) -> Router {
    router
        .layer(DefaultBodyLimit::max(MAX_REST_BODY_BYTES))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(middleware::from_fn(panic_handler))
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(?error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!(?error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}

async fn panic_handler(request: Request<Body>, next: Next) -> Response {
    match tokio::spawn(async move { next.run(request).await }).await {
        Ok(response) => response,
        Err(join_error) => {
            error!(?join_error, "request handling panicked");
            RelayError::from_code(ErrorCode::InternalError).into_response()
        }
    }
}

async fn request_context_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = request_id_from_headers_or_generate(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let mut response = with_request_id_scope(request_id.clone(), next.run(request)).await;
    attach_request_id_header(&mut response, &request_id);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started_at.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
