//! `/documents` routes: browsing for residents, publishing for
//! administrators.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use extranet_core::domain::dates::parse_expiration;
use extranet_core::domain::pagination::parse_page;
use extranet_core::{DocumentContent, DocumentsApi, ExtranetResult, UploadedDocument};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

use super::{id_of, json_body, run_blocking, RawId};
use crate::domain::error::{message, ApiError, ApiResult};
use crate::service::AppState;
use crate::session::{AdminUser, CurrentUser};

const LOCATION_MISSING: &str = "Syndicat ou catégorie manquant.";
const FILE_MISSING: &str = "Syndicat, catégorie ou nom de fichier manquant.";
const MISSING_DATA: &str = "Données manquantes.";

const ARCHIVED: &str = "Fichier archivé avec succès.";
const UPLOADED: &str = "Documents importés avec succès.";
const INFOS_UPDATED: &str = "Les infos du syndicat ont bien été mis à jour !";
const EXPIRATION_UPDATED: &str = "La date d'expiration a bien été mis à jour !";

/// RFC 5987 `attr-char`: everything else is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_documents)
                .post(upload_documents)
                .put(archive_document)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/download-file", get(download_file))
        .route("/view-pdf", get(view_file))
        .route("/syndicats", get(accessible_syndicats))
        .route("/categories", get(syndicat_categories))
        .route("/infos-syndicat", put(update_infos))
        .route("/expiration-date", put(set_expiration_date))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    syndicat_id: Option<RawId>,
    category_id: Option<RawId>,
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    syndicat_id: Option<RawId>,
    category_id: Option<RawId>,
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SyndicatQuery {
    syndicat_id: Option<RawId>,
}

#[derive(Debug, Deserialize)]
struct ArchiveBody {
    syndicat_id: Option<RawId>,
    category_id: Option<RawId>,
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfosBody {
    syndicat_id: Option<RawId>,
    infos: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExpirationBody {
    syndicat_id: Option<RawId>,
    category_id: Option<RawId>,
    file_name: Option<String>,
    expiration_date: Option<String>,
}

/// `(syndicat, category, file name)` or the given 400.
fn file_location(
    syndicat_id: &Option<RawId>,
    category_id: &Option<RawId>,
    file_name: Option<String>,
    missing: &'static str,
) -> ApiResult<(i64, i64, String)> {
    match (id_of(syndicat_id), id_of(category_id), file_name) {
        (Some(s), Some(c), Some(name)) if !name.is_empty() => Ok((s, c, name)),
        _ => Err(ApiError::bad_request(missing)),
    }
}

/// Content type from the file extension.
fn content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// `Content-Disposition` with an ASCII fallback and the UTF-8 name.
fn content_disposition(kind: &str, file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii() && c != '"' && c != '\\' && !c.is_control() { c } else { '_' })
        .collect();
    format!(
        "{kind}; filename=\"{fallback}\"; filename*=UTF-8''{}",
        utf8_percent_encode(file_name, ATTR_CHAR)
    )
}

fn serve_document(document: DocumentContent, kind: &str) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, content_type(&document.file_name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(kind, &document.file_name),
            ),
        ],
        document.bytes,
    )
}

async fn list_documents(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let (Some(syndicat_id), Some(category_id)) = (id_of(&query.syndicat_id), id_of(&query.category_id))
    else {
        return Err(ApiError::bad_request(LOCATION_MISSING));
    };
    let page = parse_page(query.page.as_deref());

    let service = state.extranet.clone();
    let listing =
        run_blocking(move || service.list_documents(user_id, syndicat_id, category_id, page)).await?;
    Ok(Json(listing))
}

async fn download_file(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<FileQuery>,
) -> ApiResult<impl IntoResponse> {
    let (syndicat_id, category_id, file_name) =
        file_location(&query.syndicat_id, &query.category_id, query.file_name, FILE_MISSING)?;

    let service = state.extranet.clone();
    let document = run_blocking(move || {
        service.open_document(user_id, syndicat_id, category_id, &file_name)
    })
    .await?;
    Ok(serve_document(document, "attachment"))
}

async fn view_file(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<FileQuery>,
) -> ApiResult<impl IntoResponse> {
    let (syndicat_id, category_id, file_name) =
        file_location(&query.syndicat_id, &query.category_id, query.file_name, FILE_MISSING)?;

    let service = state.extranet.clone();
    let document = run_blocking(move || {
        service.open_document(user_id, syndicat_id, category_id, &file_name)
    })
    .await?;
    Ok(serve_document(document, "inline"))
}

async fn archive_document(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<ArchiveBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let (syndicat_id, category_id, file_name) =
        file_location(&body.syndicat_id, &body.category_id, body.file_name, MISSING_DATA)?;

    let service = state.extranet.clone();
    run_blocking(move || service.archive_document(syndicat_id, category_id, &file_name)).await?;
    Ok(message(ARCHIVED))
}

async fn upload_documents(
    State(state): State<AppState>,
    AdminUser(uploader_id): AdminUser,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut files: Vec<(String, Bytes)> = Vec::new();
    let mut expiration_dates: Vec<String> = Vec::new();
    let mut syndicat_id = None;
    let mut category_id = None;

    let bad_part = |err: axum::extract::multipart::MultipartError| ApiError::bad_request(err.body_text());
    while let Some(field) = multipart.next_field().await.map_err(bad_part)? {
        let part = field.name().unwrap_or_default().to_string();
        match part.as_str() {
            "documents" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                files.push((file_name, field.bytes().await.map_err(bad_part)?));
            }
            "expiration_dates" | "expiration_dates[]" => {
                expiration_dates.push(field.text().await.map_err(bad_part)?);
            }
            "syndicat_id" => syndicat_id = Some(RawId::Text(field.text().await.map_err(bad_part)?)),
            "category_id" => category_id = Some(RawId::Text(field.text().await.map_err(bad_part)?)),
            _ => {}
        }
    }

    let (Some(syndicat_id), Some(category_id)) = (id_of(&syndicat_id), id_of(&category_id)) else {
        return Err(ApiError::bad_request(LOCATION_MISSING));
    };

    let documents = files
        .into_iter()
        .enumerate()
        .map(|(i, (file_name, bytes))| -> ExtranetResult<UploadedDocument> {
            Ok(UploadedDocument {
                file_name,
                bytes: bytes.to_vec(),
                expiration_date: parse_expiration(expiration_dates.get(i).map(String::as_str))?,
            })
        })
        .collect::<ExtranetResult<Vec<_>>>()?;

    let service = state.extranet.clone();
    run_blocking(move || service.upload_documents(uploader_id, syndicat_id, category_id, documents))
        .await?;
    Ok(message(UPLOADED))
}

async fn accessible_syndicats(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let service = state.extranet.clone();
    Ok(Json(run_blocking(move || service.accessible_syndicats(user_id)).await?))
}

async fn syndicat_categories(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<SyndicatQuery>,
) -> ApiResult<impl IntoResponse> {
    let syndicat_id =
        id_of(&query.syndicat_id).ok_or_else(|| ApiError::bad_request(LOCATION_MISSING))?;
    let service = state.extranet.clone();
    Ok(Json(
        run_blocking(move || service.syndicat_categories(user_id, syndicat_id)).await?,
    ))
}

async fn update_infos(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<InfosBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let syndicat_id = id_of(&body.syndicat_id).ok_or_else(|| ApiError::bad_request(MISSING_DATA))?;

    let service = state.extranet.clone();
    run_blocking(move || service.update_syndicat_infos(syndicat_id, body.infos)).await?;
    Ok(message(INFOS_UPDATED))
}

async fn set_expiration_date(
    State(state): State<AppState>,
    AdminUser(uploader_id): AdminUser,
    payload: Result<Json<ExpirationBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let (syndicat_id, category_id, file_name) =
        file_location(&body.syndicat_id, &body.category_id, body.file_name, MISSING_DATA)?;
    let expiration_date = parse_expiration(body.expiration_date.as_deref())?;

    let service = state.extranet.clone();
    run_blocking(move || {
        service.set_expiration_date(uploader_id, syndicat_id, category_id, &file_name, expiration_date)
    })
    .await?;
    Ok(message(EXPIRATION_UPDATED))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type("PV AG.PDF"), "application/pdf");
        assert_eq!(content_type("plan.jpeg"), "image/jpeg");
        assert_eq!(content_type("README"), "application/octet-stream");
    }

    #[test]
    fn test_content_disposition_keeps_utf8_name() {
        assert_eq!(
            content_disposition("attachment", "Procès-verbal 2024.pdf"),
            "attachment; filename=\"Proc_s-verbal 2024.pdf\"; filename*=UTF-8''Proc%C3%A8s-verbal%202024.pdf"
        );
    }

    #[test]
    fn test_file_location_requires_every_part() {
        let s = Some(RawId::Number(1));
        let c = Some(RawId::Text("2".into()));
        assert_eq!(
            file_location(&s, &c, Some("a.pdf".into()), FILE_MISSING).unwrap(),
            (1, 2, "a.pdf".to_string())
        );
        let err = file_location(&s, &None, Some("a.pdf".into()), FILE_MISSING).unwrap_err();
        assert_eq!(err.message, FILE_MISSING);
        assert!(file_location(&s, &c, Some(String::new()), FILE_MISSING).is_err());
    }
}
