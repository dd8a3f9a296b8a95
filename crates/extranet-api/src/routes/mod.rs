//! Route handlers, one module per URL prefix.
//!
//! Handlers stay thin: extract and check the request, run the blocking
//! service call on the blocking pool, shape the JSON answer.

pub mod auth;
pub mod documents;
pub mod settings;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use extranet_core::ExtranetResult;
use serde::Deserialize;
use tracing::error;

use crate::domain::error::{ApiError, ApiResult};

const MISSING_DATA: &str = "Données manquantes.";

/// Runs a service call on tokio's blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ExtranetResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(err) => {
            error!(error = %err, "blocking task failed");
            Err(ApiError::internal())
        }
    }
}

/// Unwraps a JSON body; unreadable bodies are a 400 like missing fields.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|_| ApiError::bad_request(MISSING_DATA))
}

/// Identifier sent either as a JSON number or as a string (form fields and
/// query strings).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    pub(crate) fn get(&self) -> Option<i64> {
        match self {
            RawId::Number(n) => Some(*n),
            RawId::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Parses an optional identifier; absent or malformed gives `None`.
pub(crate) fn id_of(raw: &Option<RawId>) -> Option<i64> {
    raw.as_ref().and_then(RawId::get)
}
