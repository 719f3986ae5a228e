//! # Custom Extractors
//!
//! Request bodies arrive as `Result<Json<T>, JsonRejection>` so handlers
//! can map rejections into the structured error body instead of axum's
//! plain-text default. Statuses follow the rejection: a missing or wrong
//! content type is 415, broken JSON is 400, and JSON of the wrong shape
//! is 422.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;

/// Unwrap a JSON body, turning rejections into [`AppError`].
pub fn extract_json<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(v)| v).map_err(AppError::from)
}

/// `?indent=true` on any document route.
#[derive(Debug, Default, Deserialize)]
pub struct Format {
    #[serde(default)]
    pub indent: bool,
}

/// Query string as [`Format`]. A malformed query is treated as the default.
pub fn format(query: Result<Query<Format>, QueryRejection>) -> Format {
    query.map(|Query(f)| f).unwrap_or_default()
}
