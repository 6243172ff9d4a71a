//! HTTP front end: one route per service operation, JSON in and out.

mod dto;
mod errors;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::application::AccountService;

pub use errors::{json_error, ApiError};

/// Build the router. `/accounts/total` is a static segment and takes
/// precedence over `/accounts/:id`.
pub fn router(service: Arc<AccountService>) -> Router {
    Router::new()
        .route(
            "/accounts",
            post(routes::create_account).get(routes::list_accounts),
        )
        .route("/accounts/total", get(routes::get_total))
        .route(
            "/accounts/:id",
            get(routes::get_account).delete(routes::remove_account),
        )
        .route("/accounts/:id/balance", get(routes::get_balance))
        .route("/accounts/:id/transactions", get(routes::get_transactions))
        .route("/accounts/:id/deposit", post(routes::deposit))
        .route("/accounts/:id/withdraw", post(routes::withdraw))
        .route("/accounts/:id/details", put(routes::change_details))
        .route("/accounts/:id/limit", put(routes::change_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serve the API on `addr` until Ctrl+C / SIGTERM.
pub async fn serve(service: Arc<AccountService>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
