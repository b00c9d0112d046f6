use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::{ReportFiles, balance, history, report, reservation};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub reports: Arc<ReportFiles>,
}

impl ServerState {
    pub fn new(engine: Engine, reports: ReportFiles) -> Self {
        Self {
            engine: Arc::new(engine),
            reports: Arc::new(reports),
        }
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/balance", get(balance::get))
        .route("/balance/replenish", post(balance::replenish))
        .route("/balance/reduce", post(balance::reduce))
        .route("/balance/transfer", post(balance::transfer))
        .route("/reservation/reserve", post(reservation::reserve))
        .route("/reservation/confirm", post(reservation::confirm))
        .route("/reservation/cancel", post(reservation::cancel))
        .route("/history", get(history::get))
        .route("/report", post(report::create))
        .route("/static/reports/{file}", get(report::download))
        .with_state(state)
}

/// Serves until Ctrl-C; in-flight requests are allowed to finish.
pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
