//! # API Route Modules
//!
//! - `documents`: the single-document operations (`/build`, `/sign`,
//!   `/verify`, `/validate`, `/correct`, `/replicate`) and `/key`.
//! - `content`: service info, embedded schemas and regime definitions.
//! - `bulk`: the bulk engine over one request body.

pub mod bulk;
pub mod content;
pub mod documents;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::AppError;
use docket_core::DocketError;

/// A JSON response, pretty-printed on `?indent=true`.
pub struct Pretty<T> {
    pub value: T,
    pub indent: bool,
}

impl<T: Serialize> Pretty<T> {
    pub fn new(value: T, indent: bool) -> Self {
        Self { value, indent }
    }
}

impl<T: Serialize> IntoResponse for Pretty<T> {
    fn into_response(self) -> Response {
        let body = if self.indent {
            serde_json::to_vec_pretty(&self.value)
        } else {
            serde_json::to_vec(&self.value)
        };
        match body {
            Ok(bytes) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
            Err(e) => AppError::from(DocketError::Internal(format!("encoding response: {e}"))).into_response(),
        }
    }
}
