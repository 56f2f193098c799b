//! HTTP surface for Feelsy check-ins.
//!
//! # Routes
//!
//! All `/feels` routes need the `X-User-Id` header set by the auth gateway.
//!
//! - `POST /feels` create today's check-in
//! - `GET /feels/today` today's check-in
//! - `GET /feels/history?limit&offset` paged history, newest date first
//! - `GET /feels/stats` streak snapshot
//! - `POST /feels/vibe` send a good vibe
//! - `GET /feels/vibes?limit` received vibes
//! - `GET /feels/friends` friends' check-ins for today
//! - `GET /health` liveness, no identity needed
//!
//! Streak updates run in a background worker fed by a durable job table, so
//! `POST /feels` returns before the stats change.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, Method},
    routing::{get, post},
    Router,
};
use feelsy_core::{Config, Database, FeelService};
use tokio::{net::TcpListener, signal, sync::watch};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod worker;

use auth::USER_ID_HEADER;
use routes::{
    create_feel_handler, friends_handler, health_handler, history_handler, send_vibe_handler,
    stats_handler, today_handler, vibes_handler,
};
use state::State;
use worker::StreakWorker;

/// Install the global tracing subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

pub fn router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/feels", post(create_feel_handler))
        .route("/feels/today", get(today_handler))
        .route("/feels/history", get(history_handler))
        .route("/feels/stats", get(stats_handler))
        .route("/feels/vibe", post(send_vibe_handler))
        .route("/feels/vibes", get(vibes_handler))
        .route("/feels/friends", get(friends_handler))
        .layer(cors)
        .with_state(state)
}

/// Open storage, start the streak worker and serve until Ctrl+C or SIGTERM.
///
/// # Errors
/// Returns an error if the configuration is invalid, the database cannot be
/// opened, or the listener cannot bind.
pub async fn start_server(config: Config) -> feelsy_core::Result<()> {
    init_tracing();

    let db_path = config.database_path()?;
    info!("Opening database at {}", db_path.display());
    let db = Arc::new(Database::open(&db_path)?);
    let service = Arc::new(FeelService::from_config(db, &config)?);
    let state = State::new(Arc::clone(&service));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = StreakWorker::new(
        Arc::clone(&service),
        Arc::clone(&state.worker_wake),
        config.streak_worker.clone(),
    )
    .spawn(shutdown_rx);

    let app = router(state);

    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = worker.await {
        tracing::error!(error = %e, "streak worker exited abnormally");
    }
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
