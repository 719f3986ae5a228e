//! # API Error Types
//!
//! Every failure leaves the server as
//! `{"error": {"code", "key", "message", "details"?}}` with the HTTP
//! status equal to `code`. Pipeline errors keep their own code and key;
//! field errors travel in `details`. Internal messages are logged, not
//! returned.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docket_core::DocketError;
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// HTTP status code.
    pub code: u16,
    /// Stable error key (`validation`, `key-mismatch`, …).
    pub key: String,
    /// Human-readable message.
    pub message: String,
    /// Field errors, for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A pipeline failure.
    #[error(transparent)]
    Docket(#[from] DocketError),

    /// The body was not JSON, or not the expected shape.
    #[error("{message}")]
    Body { status: StatusCode, message: String },

    /// Nothing to work on.
    #[error("no payload")]
    NoPayload,

    /// Unknown route target.
    #[error("{0}")]
    NotFound(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Docket(e) => StatusCode::from_u16(e.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Body { status, .. } => *status,
            Self::NoPayload => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn key(&self) -> &'static str {
        match self {
            Self::Docket(e) => e.key(),
            Self::Body { status, .. } if *status == StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported-media-type",
            Self::Body { .. } | Self::NoPayload => "bad-request",
            Self::NotFound(_) => "not-found",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Docket(DocketError::Internal(_)) => {
                tracing::error!(error = %self, "internal server error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let details = match &self {
            Self::Docket(e) => e.fields().and_then(|f| serde_json::to_value(f).ok()),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: status.as_u16(),
                key: self.key().to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::FieldErrors;

    #[test]
    fn pipeline_codes_become_statuses() {
        let err = AppError::from(DocketError::KeyMismatch("kid".into()));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.key(), "key-mismatch");

        let err = AppError::from(DocketError::BadRequest("nope".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn no_payload_is_bad_request() {
        assert_eq!(AppError::NoPayload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NoPayload.to_string(), "no payload");
    }

    #[tokio::test]
    async fn validation_details_in_body() {
        use http_body_util::BodyExt;

        let err = AppError::from(DocketError::Validation(FieldErrors::single("totals", "cannot be blank")));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"]["key"], "validation");
        assert_eq!(v["error"]["details"]["totals"], "cannot be blank");
    }

    #[tokio::test]
    async fn internal_messages_are_hidden() {
        use http_body_util::BodyExt;

        let res = AppError::from(DocketError::Internal("secret path".into())).into_response();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert!(!String::from_utf8_lossy(&bytes).contains("secret"));
    }
}
