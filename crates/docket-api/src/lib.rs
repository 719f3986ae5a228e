//! # docket-api — HTTP Adapter
//!
//! Exposes the document pipeline and the bulk engine over HTTP.
//!
//! ## API Surface
//!
//! | Prefix                   | Module                  | Purpose                      |
//! |--------------------------|-------------------------|------------------------------|
//! | `/`                      | [`routes::content`]     | Service info                 |
//! | `/build`, `/sign`, …     | [`routes::documents`]   | Single-document operations   |
//! | `/key`                   | [`routes::documents`]   | Key pair generation          |
//! | `/bulk`                  | [`routes::bulk`]        | Bulk request stream          |
//! | `/schemas/*`             | [`routes::content`]     | Embedded JSON Schemas        |
//! | `/regimes/*`             | [`routes::content`]     | Regime definitions           |
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; they delegate to `docket-engine`.
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Largest accepted request body. `/bulk` reads the whole stream at once.
const BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::content::router())
        .merge(routes::documents::router())
        .merge(routes::bulk::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    tracing::info!(addr = ?listener.local_addr().ok(), "docket server listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
