//! # Content Routes
//!
//! Read-only views of what the server was built with.
//!
//! | Method | Path                | Response                          |
//! |--------|---------------------|-----------------------------------|
//! | GET    | `/`                 | service name and version          |
//! | GET    | `/schemas`          | `{"list": [ids…]}`                |
//! | GET    | `/schemas/{*path}`  | raw schema JSON                   |
//! | GET    | `/regimes/{code}`   | regime definition                 |

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use docket_engine::content;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::extractors::{format, Format};
use crate::routes::Pretty;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(info))
        .route("/schemas", get(list_schemas))
        .route("/schemas/{*path}", get(get_schema))
        .route("/regimes/{code}", get(get_regime))
}

async fn info(query: Result<Query<Format>, QueryRejection>) -> Pretty<Value> {
    Pretty::new(
        json!({
            "slogan": "Process electronic business documents.",
            "name": "docket",
            "version": env!("CARGO_PKG_VERSION"),
        }),
        format(query).indent,
    )
}

async fn list_schemas(query: Result<Query<Format>, QueryRejection>) -> Pretty<Value> {
    Pretty::new(json!({"list": content::schema_ids()}), format(query).indent)
}

/// The embedded file is returned as stored.
async fn get_schema(Path(path): Path<String>) -> Result<Response, AppError> {
    let raw = content::schema(&path).map_err(not_found)?;
    Ok(([(header::CONTENT_TYPE, "application/schema+json")], raw).into_response())
}

async fn get_regime(
    State(state): State<AppState>,
    Path(code): Path<String>,
    query: Result<Query<Format>, QueryRejection>,
) -> Result<Pretty<Value>, AppError> {
    let def = content::regime(state.registry(), &code).map_err(not_found)?;
    Ok(Pretty::new(def, format(query).indent))
}

fn not_found(err: docket_core::DocketError) -> AppError {
    AppError::NotFound(err.to_string())
}
