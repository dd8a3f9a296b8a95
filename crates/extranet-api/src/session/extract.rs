//! Request guards built on the session cookie.
//!
//! - [`MaybeUser`]: the session, if any
//! - [`CurrentUser`]: a live session, else 401
//! - [`AdminUser`]: a live session of an administrator, else 401/403

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use extranet_core::{messages, AuthApi, UserId};
use tracing::warn;

use crate::domain::error::ApiError;
use crate::routes::run_blocking;
use crate::service::AppState;

/// Session of the caller, when there is one
#[derive(Debug, Clone)]
pub struct MaybeUser {
    pub session_id: Option<String>,
    pub user_id: Option<UserId>,
}

/// Authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

/// Authenticated administrator
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(session_id) = state.signer.session_id(&parts.headers) else {
            return Ok(Self {
                session_id: None,
                user_id: None,
            });
        };

        let user_id = state.sessions.get(&session_id).await.map_err(|err| {
            warn!(error = %err, "session lookup failed");
            ApiError::internal()
        })?;

        Ok(Self {
            session_id: Some(session_id),
            user_id,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = MaybeUser::from_request_parts(parts, state).await?;
        session
            .user_id
            .map(CurrentUser)
            .ok_or_else(ApiError::login_required)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user_id) = CurrentUser::from_request_parts(parts, state).await?;

        let service = state.extranet.clone();
        if run_blocking(move || service.is_admin(user_id)).await? {
            Ok(AdminUser(user_id))
        } else {
            Err(ApiError::forbidden(messages::ADMIN_ONLY))
        }
    }
}
