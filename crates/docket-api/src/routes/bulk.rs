//! # Bulk Route
//!
//! `POST /bulk` runs the bulk engine over the request body. Requests are
//! JSON values separated by whitespace; the response is one JSON line per
//! request in completion order, then the final line.

use std::io::Cursor;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use docket_core::DocketError;
use docket_engine::bulk::write_responses;
use tokio::sync::watch;

use crate::error::AppError;
use crate::state::AppState;

pub const NDJSON: &str = "application/x-ndjson";

pub fn router() -> Router<AppState> {
    Router::new().route("/bulk", post(bulk))
}

async fn bulk(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::NoPayload);
    }
    let (_cancel_tx, cancel) = watch::channel(false);
    let rx = state.bulk.spawn(Cursor::new(body.to_vec()), cancel);
    let mut out = Vec::new();
    write_responses(rx, &mut out)
        .await
        .map_err(|e| DocketError::Internal(format!("writing bulk responses: {e}")))?;
    tracing::debug!(bytes = out.len(), "bulk request complete");
    Ok(([(header::CONTENT_TYPE, NDJSON)], out).into_response())
}
