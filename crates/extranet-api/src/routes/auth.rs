//! `/authentication` routes: login, sessions and passwords.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use extranet_core::{messages, AuthApi, ExtranetError, ResetRequest};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{json_body, run_blocking};
use crate::domain::error::{message, ApiError, ApiResult};
use crate::service::AppState;
use crate::session::{CurrentUser, MaybeUser};

const PASSWORD_CHANGED: &str = "Le mot de passe a bien été modifié !";
const PASSWORD_RESET: &str = "Votre mot de passe a été modifié avec succès !";
const RESET_LINK_SENT: &str =
    "Veuillez suivre les instructions envoyées par mail (lien valide pendant 15 min)";
const LOGGED_OUT: &str = "Déconnexion réussie";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/login", post(login))
        .route("/check-first-login", get(check_first_login))
        .route("/check-admin", get(check_admin))
        .route("/first-login", put(first_login))
        .route("/reset-pwd-link", post(reset_link))
        .route("/reset-pwd/:token", put(reset_password))
        .route("/check-token-reset-pwd/:token", get(check_reset_token))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct PasswordBody {
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct EmailBody {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct NewPasswordBody {
    #[serde(default)]
    new_password: String,
}

async fn profile(State(state): State<AppState>, session: MaybeUser) -> ApiResult<impl IntoResponse> {
    let Some(user_id) = session.user_id else {
        return Ok(message(messages::PLEASE_LOG_IN).into_response());
    };
    let service = state.extranet.clone();
    let profile = run_blocking(move || service.profile(user_id)).await?;
    Ok(Json(profile).into_response())
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let service = state.extranet.clone();
    let outcome = run_blocking(move || service.login(body.email.trim(), &body.password)).await?;

    let session_id = state.sessions.create(outcome.user_id).await.map_err(|err| {
        warn!(error = %err, "session could not be opened");
        ApiError::internal()
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, state.signer.set_cookie(&session_id));
    Ok((headers, Json(json!({ "first_login": outcome.first_login }))))
}

async fn check_first_login(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    let first_login = run_blocking(move || service.first_login_status(user_id)).await?;
    Ok(Json(json!({ "first_login": first_login })))
}

async fn check_admin(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    let is_admin = run_blocking(move || service.is_admin(user_id)).await?;
    Ok(Json(json!({ "isAdmin": is_admin })))
}

async fn first_login(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<PasswordBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let service = state.extranet.clone();
    run_blocking(move || service.change_first_password(user_id, &body.password)).await?;
    Ok(message(PASSWORD_CHANGED))
}

async fn reset_link(
    State(state): State<AppState>,
    payload: Result<Json<EmailBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let service = state.extranet.clone();
    let outcome = run_blocking(move || service.request_password_reset(body.email.trim())).await?;

    Ok(match outcome {
        ResetRequest::NoAccount => message(messages::NO_ACCOUNT_FOR_EMAIL),
        ResetRequest::Sent => message(RESET_LINK_SENT),
    })
}

async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    payload: Result<Json<NewPasswordBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let service = state.extranet.clone();
    run_blocking(move || service.reset_password(&token, &body.new_password)).await?;
    Ok(message(PASSWORD_RESET))
}

async fn check_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    let checked = tokio::task::spawn_blocking(move || service.check_reset_token(&token))
        .await
        .map_err(|_| ApiError::internal())?;

    match checked {
        Ok(()) => Ok(Json(json!({ "valid": true }))),
        Err(err @ ExtranetError::Unauthorized(_)) => {
            Err(ApiError::from(err).with_field("valid", false))
        }
        Err(err) => Err(err.into()),
    }
}

async fn logout(State(state): State<AppState>, session: MaybeUser) -> ApiResult<impl IntoResponse> {
    if let Some(session_id) = &session.session_id {
        state.sessions.destroy(session_id).await.map_err(|err| {
            warn!(error = %err, "session could not be destroyed");
            ApiError::internal()
        })?;
    }
    if let Some(user_id) = session.user_id {
        info!(user_id, "user logged out");
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, state.signer.clear_cookie());
    Ok((headers, message(LOGGED_OUT)))
}
