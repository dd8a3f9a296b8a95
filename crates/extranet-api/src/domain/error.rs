//! HTTP error type.
//!
//! Every failure is answered with `{"message": "..."}` and a status derived
//! from the error kind. Infrastructure failures are logged and replaced by a
//! generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use extranet_core::{messages, ExtranetError};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::error;

/// HTTP error with the message shown to the user
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Response status
    pub status: StatusCode,
    /// Message shown to the user
    pub message: String,
    /// Extra fields merged into the JSON body
    pub extra: Option<Map<String, Value>>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            extra: None,
        }
    }

    /// Add a field next to `message` in the body
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Generic 500; details belong in the logs
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, messages::SERVER_ERROR)
    }

    /// Session missing or expired
    pub fn login_required() -> Self {
        Self::unauthorized(messages::PLEASE_LOG_IN)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = self.extra.unwrap_or_default();
        body.insert("message".to_string(), Value::String(self.message));
        (self.status, Json(Value::Object(body))).into_response()
    }
}

impl From<ExtranetError> for ApiError {
    fn from(err: ExtranetError) -> Self {
        let message = err.to_string();
        match err {
            ExtranetError::NotFound(_) => Self::not_found(message),
            ExtranetError::Unauthorized(_) => Self::unauthorized(message),
            ExtranetError::Forbidden(_) => Self::forbidden(message),
            ExtranetError::Validation(_) => Self::bad_request(message),
            ExtranetError::Conflict(_) => Self::new(StatusCode::CONFLICT, message),
            other => {
                error!(error = %other, "request failed");
                Self::internal()
            }
        }
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// `{"message": ...}` success body
pub fn message(text: impl Into<String>) -> Json<Value> {
    Json(json!({ "message": text.into() }))
}

/// Server-level errors (startup, bind, session backend)
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Session backend unavailable
    #[error("session store error: {0}")]
    SessionStore(String),
}
