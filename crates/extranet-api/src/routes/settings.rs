//! `/settings` routes: accounts, syndicats and categories. Administrators
//! only.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use extranet_core::{
    messages, CategoryId, Civilite, Role, SettingsApi, SyndicatId, UserId, UserUpdate,
};
use serde::Deserialize;
use serde_json::json;

use super::{id_of, json_body, run_blocking, RawId};
use crate::domain::error::{message, ApiError, ApiResult};
use crate::service::AppState;
use crate::session::AdminUser;

const ACCOUNTS_FIELD: &str = "addAccounts";
const TEMPLATE_FILE: &str = "template_add_users.csv";
const EXPORT_FILE: &str = "users_export.csv";

const ACCOUNTS_CREATED: &str = "Les comptes ont bien été créés et les emails envoyés.";
const USER_UPDATED: &str = "La modification de l'utilisateur est un succès !";
const USER_DELETED: &str = "La suppression de l'utilisateur est un succès !";
const SYNDICAT_CREATED: &str = "La création du nouveau syndicat est un succès !";
const SYNDICAT_UPDATED: &str = "La mise à jour du syndicat est un succès !";
const SYNDICAT_DELETED: &str = "La suppression du syndicat est un succès.";
const CATEGORY_DELETED: &str = "La suppression de la catégorie est un succès !";
const MISSING_DATA: &str = "Données manquantes.";

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users)
                .post(import_accounts)
                .put(update_user)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/users/download-template", get(download_template))
        .route("/users/download-export", get(download_export))
        .route("/users/:user_id", delete(delete_user))
        .route(
            "/syndicats",
            get(list_syndicats).post(create_syndicat).put(update_syndicat),
        )
        .route("/syndicats/:syndicat_id", delete(delete_syndicat))
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:category_id", delete(delete_category))
}

/// `{id}` entries of nested lists sent by the frontend.
#[derive(Debug, Deserialize)]
struct IdRef {
    id: Option<RawId>,
}

fn ids(refs: &[IdRef]) -> ApiResult<Vec<i64>> {
    refs.iter()
        .map(|r| id_of(&r.id).ok_or_else(|| ApiError::bad_request(MISSING_DATA)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct UpdateUserBody {
    user_id: Option<RawId>,
    civilite: Option<String>,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    surname: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    syndicats: Vec<IdRef>,
}

#[derive(Debug, Deserialize)]
struct CreateSyndicatBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    categories: Vec<IdRef>,
}

#[derive(Debug, Deserialize)]
struct UpdateSyndicatBody {
    syndicat_id: Option<RawId>,
    #[serde(default)]
    categories: Vec<IdRef>,
}

#[derive(Debug, Deserialize)]
struct CategoryBody {
    #[serde(default)]
    name: String,
}

fn csv_attachment(file_name: &str, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
}

async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    Ok(Json(run_blocking(move || service.list_users()).await?))
}

async fn download_template(State(state): State<AppState>, _admin: AdminUser) -> impl IntoResponse {
    csv_attachment(TEMPLATE_FILE, state.extranet.users_template().into_bytes())
}

async fn download_export(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    let bytes = run_blocking(move || service.export_users()).await?;
    Ok(csv_attachment(EXPORT_FILE, bytes))
}

async fn import_accounts(
    State(state): State<AppState>,
    _admin: AdminUser,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut sheet = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.body_text()))?
    {
        if field.name() != Some(ACCOUNTS_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or("comptes.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(err.body_text()))?;
        sheet = Some((name, bytes));
    }

    let (name, bytes) = sheet.ok_or_else(|| ApiError::bad_request(messages::NO_FILE_UPLOADED))?;
    let service = state.extranet.clone();
    let summary = run_blocking(move || service.import_accounts(&name, &bytes)).await?;

    Ok(Json(json!({
        "message": ACCOUNTS_CREATED,
        "created": summary.created,
        "mail_failures": summary.mail_failures,
    })))
}

async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<UpdateUserBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let user_id: UserId = id_of(&body.user_id).ok_or_else(|| ApiError::bad_request(MISSING_DATA))?;
    let civilite = match body.civilite.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<Civilite>()?),
    };
    let role: Role = body.role.trim().parse()?;

    let update = UserUpdate {
        user_id,
        civilite,
        first_name: body.first_name.trim().to_string(),
        surname: body.surname.trim().to_string(),
        email: body.email.trim().to_string(),
        role,
        syndicat_ids: ids(&body.syndicats)?,
    };

    let service = state.extranet.clone();
    run_blocking(move || service.update_user(update)).await?;
    Ok(message(USER_UPDATED))
}

async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<UserId>,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    run_blocking(move || service.delete_user(user_id)).await?;
    Ok(message(USER_DELETED))
}

async fn list_syndicats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    Ok(Json(run_blocking(move || service.list_syndicats()).await?))
}

async fn create_syndicat(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<CreateSyndicatBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let category_ids: Vec<CategoryId> = ids(&body.categories)?;

    let service = state.extranet.clone();
    let syndicat_id =
        run_blocking(move || service.create_syndicat(&body.name, &category_ids)).await?;
    Ok(Json(json!({ "message": SYNDICAT_CREATED, "syndicat_id": syndicat_id })))
}

async fn update_syndicat(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<UpdateSyndicatBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let syndicat_id: SyndicatId =
        id_of(&body.syndicat_id).ok_or_else(|| ApiError::bad_request(MISSING_DATA))?;
    let category_ids = ids(&body.categories)?;

    let service = state.extranet.clone();
    run_blocking(move || service.update_syndicat(syndicat_id, &category_ids)).await?;
    Ok(message(SYNDICAT_UPDATED))
}

async fn delete_syndicat(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(syndicat_id): Path<SyndicatId>,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    run_blocking(move || service.delete_syndicat(syndicat_id)).await?;
    Ok(message(SYNDICAT_DELETED))
}

async fn list_categories(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    Ok(Json(run_blocking(move || service.list_categories()).await?))
}

async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<CategoryBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let service = state.extranet.clone();
    let outcome = run_blocking(move || service.create_category(&body.name)).await?;
    Ok(message(outcome.message()))
}

async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(category_id): Path<CategoryId>,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    run_blocking(move || service.delete_category(category_id)).await?;
    Ok(message(CATEGORY_DELETED))
}
