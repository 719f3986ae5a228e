//! # Document Routes
//!
//! One request, one document. Bodies use the same payloads as the bulk
//! actions of the same name; `?indent=true` pretty-prints the result.
//!
//! | Method | Path         | Body                                    | Response              |
//! |--------|--------------|-----------------------------------------|-----------------------|
//! | POST   | `/build`     | `{template?, data, type?, envelop?}`    | envelope or document  |
//! | POST   | `/sign`      | `{template?, data, privatekey?, …}`     | envelope              |
//! | POST   | `/verify`    | `{data, publickey}`                     | `{"ok": true}`        |
//! | POST   | `/validate`  | `{data}`                                | `{"ok": true}`        |
//! | POST   | `/correct`   | `{data, options?, schema?}`             | document or schema    |
//! | POST   | `/replicate` | `{data}`                                | envelope or document  |
//! | POST   | `/key`       | none                                    | `{private, public}`   |

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use docket_crypto::KeyPair;
use docket_engine::payload::{
    BuildRequest, CorrectRequest, Data, ReplicateRequest, SignRequest, ValidateRequest, VerifyRequest,
};
use docket_engine::{ops, Corrected, ParseOptions, Parsed};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::extractors::{extract_json, format, Format};
use crate::routes::Pretty;
use crate::state::AppState;

type Body<T> = Result<Json<T>, JsonRejection>;
type Fmt = Result<Query<Format>, QueryRejection>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/build", post(build))
        .route("/sign", post(sign))
        .route("/verify", post(verify))
        .route("/validate", post(validate))
        .route("/correct", post(correct))
        .route("/replicate", post(replicate))
        .route("/key", post(key))
}

fn require(data: &Data) -> Result<(), AppError> {
    if data.is_empty() {
        return Err(AppError::NoPayload);
    }
    Ok(())
}

async fn build(
    State(state): State<AppState>,
    query: Fmt,
    body: Body<BuildRequest>,
) -> Result<Pretty<Parsed>, AppError> {
    let req = extract_json(body)?;
    require(&req.data)?;
    let out = ops::build(state.registry(), &req.parse_options())?;
    Ok(Pretty::new(out, format(query).indent))
}

async fn sign(
    State(state): State<AppState>,
    query: Fmt,
    body: Body<SignRequest>,
) -> Result<Pretty<Parsed>, AppError> {
    let req = extract_json(body)?;
    require(&req.data)?;
    let (opts, key) = req.into_parts();
    let key = key.as_ref().unwrap_or(state.default_key());
    let out = ops::sign(state.registry(), &opts, key)?;
    Ok(Pretty::new(out, format(query).indent))
}

async fn verify(
    State(state): State<AppState>,
    query: Fmt,
    body: Body<VerifyRequest>,
) -> Result<Pretty<Value>, AppError> {
    let req = extract_json(body)?;
    require(&req.data)?;
    ops::verify(state.registry(), &req.data.0, &req.publickey)?;
    Ok(Pretty::new(json!({"ok": true}), format(query).indent))
}

async fn validate(
    State(state): State<AppState>,
    query: Fmt,
    body: Body<ValidateRequest>,
) -> Result<Pretty<Value>, AppError> {
    let req = extract_json(body)?;
    require(&req.data)?;
    ops::validate(state.registry(), &req.data.0)?;
    Ok(Pretty::new(json!({"ok": true}), format(query).indent))
}

async fn correct(
    State(state): State<AppState>,
    query: Fmt,
    body: Body<CorrectRequest>,
) -> Result<Pretty<Corrected>, AppError> {
    let req = extract_json(body)?;
    require(&req.data)?;
    let out = ops::correct(state.registry(), &req.correct_options())?;
    Ok(Pretty::new(out, format(query).indent))
}

async fn replicate(
    State(state): State<AppState>,
    query: Fmt,
    body: Body<ReplicateRequest>,
) -> Result<Pretty<Parsed>, AppError> {
    let req = extract_json(body)?;
    require(&req.data)?;
    let out = ops::replicate(state.registry(), &ParseOptions::new(req.data.into_bytes()))?;
    Ok(Pretty::new(out, format(query).indent))
}

async fn key(query: Fmt) -> Pretty<KeyPair> {
    Pretty::new(ops::keygen(), format(query).indent)
}
