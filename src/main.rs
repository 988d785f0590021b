//! brokerd entry point: loads configuration, brings up the single
//! upstream session, and serves the HTTP facade and streaming hub on
//! one axum server.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use brokerd::config::AppConfig;
use brokerd::domain::audit::InMemoryAuditStore;
use brokerd::facade::auth::AuthState;
use brokerd::facade::{FacadeState, router as facade_router};
use brokerd::hub::{Hub, ws_handler};
use brokerd::logging::init_logging;
use brokerd::quotes::QuoteManager;
use brokerd::upstream::fake::FakeUpstream;
use brokerd::worker::{Dispatcher, RetryPolicy, WorkerSessionManager};
use brokerd::Bus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let _log_guard = init_logging(&config);

    tracing::info!(bind_addr = %config.bind_addr, demo_mode = config.demo_mode, "starting brokerd");

    if !config.demo_mode {
        tracing::warn!(
            "BROKERD_DEMO_MODE=false requested, but this build carries no real brokerage \
             client (§1 component H is a collaborator seam) - falling back to the in-memory fake"
        );
    }

    let bus = Bus::with_capacity(config.bus_capacity);

    let retry = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        base_delay: std::time::Duration::from_millis(config.retry_base_delay_ms),
        max_delay: std::time::Duration::from_millis(config.retry_max_delay_ms),
    };

    let session = Arc::new(FakeUpstream::new());
    let session_mgr = Arc::new(WorkerSessionManager::new(session.clone(), retry));
    session_mgr.establish().await;

    let quotes = QuoteManager::new(session.clone(), bus.clone());
    quotes.start_ingestion();

    let audit = Arc::new(InMemoryAuditStore::new());

    let dispatcher = Arc::new(Dispatcher::new(bus.clone(), session_mgr.clone(), quotes, audit));
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run().await;
    });

    let worker_ready = {
        let session_mgr = session_mgr.clone();
        Arc::new(move || session_mgr.is_ready()) as Arc<dyn Fn() -> bool + Send + Sync>
    };
    let facade_state = FacadeState::new(bus.clone(), worker_ready);
    let auth_state = AuthState::new(config.auth_key.clone());

    let hub = Hub::new(bus.clone());
    let hub_router = Router::new()
        .route("/ws/quotes", get(ws_handler))
        .with_state(hub);

    let app = Router::new()
        .merge(facade_router(facade_state, auth_state))
        .merge(hub_router);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dispatcher_handle.abort();
    session_mgr.retire().await;
    tracing::info!("brokerd shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
