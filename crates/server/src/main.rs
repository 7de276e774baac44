//! Fastprint server - HTTP API for book printing orders.
//!
//! Serves the JSON API used by the Fastprint storefront on port 8000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON and multipart bodies
//! - `PostgreSQL` via sqlx for profiles, cart items and book projects
//! - tower-sessions with the `PostgreSQL` store for login sessions
//! - Uploaded PDFs and covers on local disk under `FASTPRINT_MEDIA_ROOT`
//!
//! Schema migrations are NOT run on startup. Run them explicitly with
//! `fastprint-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;

use fastprint_server::config::{FastprintConfig, SentryConfig};
use fastprint_server::db::{self, Storage};
use fastprint_server::middleware::create_session_layer;
use fastprint_server::state::AppState;
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "fastprint_server=info,tower_http=debug";

/// Start Sentry when a DSN is configured. The guard flushes events on drop.
fn init_sentry(sentry: &SentryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = sentry.dsn.as_deref()?;

    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: sentry.environment.clone().map(Cow::Owned),
        sample_rate: sentry.sample_rate,
        traces_sample_rate: sentry.traces_sample_rate,
        attach_stacktrace: true,
        ..Default::default()
    };
    Some(sentry::init((dsn, options)))
}

/// Warnings and errors become Sentry events, info and debug breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> EventFilter {
    let level = *metadata.level();
    if level <= tracing::Level::WARN {
        EventFilter::Event
    } else if level <= tracing::Level::DEBUG {
        EventFilter::Breadcrumb
    } else {
        EventFilter::Ignore
    }
}

/// Install the tracing subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let config = FastprintConfig::from_env().expect("Failed to load configuration");

    // Sentry must be up before the subscriber so its layer has a client.
    let sentry_guard = init_sentry(&config.sentry);
    init_tracing();
    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // The session table belongs to tower-sessions; creating it is idempotent.
    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .expect("Failed to prepare session store");

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .expect("Failed to create media root");
    tracing::info!(media_root = %config.media_root.display(), "Media root ready");

    let addr = config.socket_addr();
    let session_layer = create_session_layer(session_store, config.secure_cookies());
    let app = fastprint_server::app(AppState::new(config, Storage::postgres(pool)), session_layer);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!("fastprint-server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    drop(sentry_guard);
}

/// Resolve on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.expect("Failed to install Ctrl+C handler"),
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
