//! End-to-end tests of the HTTP API against an in-memory database.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use extranet_api::{build_router, ApiConfig, AppState, MemorySessionStore};
use extranet_core::{
    messages, BcryptHasher, Database, DocumentsApi, ExtranetDependencies, ExtranetService,
    LocalDocumentStore, OutboxMailer, Role, ServiceConfig, SettingsApi, SyndicatId, SystemClock,
    UploadedDocument, UserId, UserUpdate,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const PASSWORD: &str = "Initial-pass1!";

struct TestApp {
    router: Router,
    service: ExtranetService,
    outbox: OutboxMailer,
    _dir: TempDir,
}

fn make_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let outbox = OutboxMailer::new();
    let deps = ExtranetDependencies {
        database: Database::open_in_memory().unwrap(),
        documents: Arc::new(LocalDocumentStore::new(
            dir.path().join("documents"),
            dir.path().join("comptes"),
        )),
        mailer: Arc::new(outbox.clone()),
        hasher: Arc::new(BcryptHasher::new(4)),
        clock: Arc::new(SystemClock),
    };
    let service = ExtranetService::new(
        deps,
        ServiceConfig {
            frontend_url: "http://front.test".into(),
            reset_secret: "reset-secret-for-http-tests".into(),
            ..ServiceConfig::default()
        },
    );

    let mut config = ApiConfig::default();
    config.session.secret = "s".repeat(32);
    let sessions = Arc::new(MemorySessionStore::new(Duration::from_secs(3600)));
    let state = AppState::new(service.clone(), sessions, config);

    TestApp {
        router: build_router(state),
        service,
        outbox,
        _dir: dir,
    }
}

impl TestApp {
    fn admin(&self, email: &str) -> UserId {
        self.service
            .create_admin(email, "Alice", "Durand", Some(PASSWORD))
            .unwrap()
            .user_id
    }

    fn resident(&self, email: &str, syndicats: &[SyndicatId]) -> UserId {
        let user_id = self.admin(email);
        self.service
            .update_user(UserUpdate {
                user_id,
                civilite: None,
                first_name: "Bruno".into(),
                surname: "Martin".into(),
                email: email.into(),
                role: Role::User,
                syndicat_ids: syndicats.to_vec(),
            })
            .unwrap();
        user_id
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(request).await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    /// Logs in and returns the `Cookie` header value for later requests.
    async fn login(&self, email: &str) -> String {
        let (status, headers, _) = self
            .send(json_request(Method::POST, "/authentication/login", None, json!({
                "email": email,
                "password": PASSWORD,
            })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = make_test_app();
    let (status, _, body) = app.send(get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_login_sets_signed_session_cookie() {
    let app = make_test_app();
    app.admin("admin@syndic.test");

    let (status, headers, body) = app
        .send(json_request(Method::POST, "/authentication/login", None, json!({
            "email": "admin@syndic.test",
            "password": PASSWORD,
        })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("extranet.sid="));
    assert!(set_cookie.contains("HttpOnly"));
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body.get("first_login").is_some());

    let cookie = set_cookie.split(';').next().unwrap();
    let (status, profile) = app.json(get("/authentication/profile", Some(cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["first_name"], "Alice");

    let (_, admin) = app.json(get("/authentication/check-admin", Some(cookie))).await;
    assert_eq!(admin, json!({ "isAdmin": true }));
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = make_test_app();
    app.admin("admin@syndic.test");

    let (status, body) = app
        .json(json_request(Method::POST, "/authentication/login", None, json!({
            "email": "admin@syndic.test",
            "password": "nope",
        })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], messages::BAD_CREDENTIALS);
}

#[tokio::test]
async fn test_unreadable_body_is_bad_request() {
    let app = make_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/authentication/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.json(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Données manquantes.");
}

#[tokio::test]
async fn test_profile_without_session_asks_to_log_in() {
    let app = make_test_app();
    let (status, body) = app.json(get("/authentication/profile", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], messages::PLEASE_LOG_IN);
}

#[tokio::test]
async fn test_guards_reject_missing_and_forged_sessions() {
    let app = make_test_app();

    let (status, _) = app.json(get("/documents/syndicats", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = "extranet.sid=abc.0000";
    let (status, _) = app.json(get("/documents/syndicats", Some(forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_settings_are_admin_only() {
    let app = make_test_app();
    app.resident("resident@syndic.test", &[]);
    let cookie = app.login("resident@syndic.test").await;

    let (status, body) = app.json(get("/settings/users", Some(&cookie))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], messages::ADMIN_ONLY);
}

#[tokio::test]
async fn test_settings_syndicat_and_category_lifecycle() {
    let app = make_test_app();
    app.admin("admin@syndic.test");
    let cookie = app.login("admin@syndic.test").await;

    let (status, _) = app
        .json(json_request(Method::POST, "/settings/categories", Some(&cookie), json!({ "name": "PV AG" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, categories) = app.json(get("/settings/categories", Some(&cookie))).await;
    let category_id = categories[0]["category_id"].as_i64().unwrap();

    let (status, created) = app
        .json(json_request(Method::POST, "/settings/syndicats", Some(&cookie), json!({
            "name": "Les Tilleuls",
            "categories": [{ "id": category_id.to_string() }],
        })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(created["syndicat_id"].as_i64().is_some());

    let (status, _) = app
        .json(json_request(Method::POST, "/settings/syndicats", Some(&cookie), json!({
            "name": "Les Tilleuls",
            "categories": [],
        })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, syndicats) = app.json(get("/settings/syndicats", Some(&cookie))).await;
    assert_eq!(syndicats.as_array().unwrap().len(), 1);

    let syndicat_id = created["syndicat_id"].as_i64().unwrap();
    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/settings/syndicats/{syndicat_id}"))
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.json(delete).await;
    assert_eq!(status, StatusCode::OK);
    let (_, syndicats) = app.json(get("/settings/syndicats", Some(&cookie))).await;
    assert!(syndicats.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_template_download_is_csv_attachment() {
    let app = make_test_app();
    app.admin("admin@syndic.test");
    let cookie = app.login("admin@syndic.test").await;

    let (status, headers, body) = app
        .send(get("/settings/users/download-template", Some(&cookie)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("template_add_users.csv"));
    assert!(String::from_utf8(body).unwrap().starts_with("Civilite"));
}

#[tokio::test]
async fn test_import_without_file_is_rejected() {
    let app = make_test_app();
    app.admin("admin@syndic.test");
    let cookie = app.login("admin@syndic.test").await;

    let boundary = "XBOUNDARY";
    let body = format!("--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{boundary}--\r\n");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/settings/users")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();
    let (status, body) = app.json(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], messages::NO_FILE_UPLOADED);
}

#[tokio::test]
async fn test_documents_listing_and_download() {
    let app = make_test_app();
    let admin = app.admin("admin@syndic.test");
    let category = match app.service.create_category("PV AG").unwrap() {
        extranet_core::CategoryCreation::Created(id) => id,
        other => panic!("unexpected {other:?}"),
    };
    let tilleuls = app.service.create_syndicat("Les Tilleuls", &[category]).unwrap();
    let other = app.service.create_syndicat("Les Chênes", &[category]).unwrap();
    app.service
        .upload_documents(
            admin,
            tilleuls,
            category,
            vec![UploadedDocument {
                file_name: "Procès-verbal 2024.pdf".into(),
                bytes: b"%PDF-1.4".to_vec(),
                expiration_date: None,
            }],
        )
        .unwrap();
    app.resident("resident@syndic.test", &[tilleuls]);
    let cookie = app.login("resident@syndic.test").await;

    let (status, syndicats) = app.json(get("/documents/syndicats", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(syndicats.as_array().unwrap().len(), 1);

    let uri = format!("/documents?syndicat_id={tilleuls}&category_id={category}&page=1");
    let (status, page) = app.json(get(&uri, Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["files"][0]["file_name"], "Procès-verbal 2024.pdf");

    let uri = format!(
        "/documents/download-file?syndicat_id={tilleuls}&category_id={category}&file_name=Proc%C3%A8s-verbal%202024.pdf"
    );
    let (status, headers, body) = app.send(get(&uri, Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"%PDF-1.4");
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename*=UTF-8''Proc%C3%A8s-verbal%202024.pdf"));

    let uri = format!("/documents?syndicat_id={other}&category_id={category}");
    let (status, body) = app.json(get(&uri, Some(&cookie))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], messages::SYNDICAT_FORBIDDEN);

    let (status, body) = app.json(get("/documents?syndicat_id=1", Some(&cookie))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Syndicat ou catégorie manquant.");
}

#[tokio::test]
async fn test_admin_uploads_through_multipart() {
    let app = make_test_app();
    app.admin("admin@syndic.test");
    let category = match app.service.create_category("Contrats").unwrap() {
        extranet_core::CategoryCreation::Created(id) => id,
        other => panic!("unexpected {other:?}"),
    };
    let syndicat = app.service.create_syndicat("Les Tilleuls", &[category]).unwrap();
    let cookie = app.login("admin@syndic.test").await;

    let boundary = "XBOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"syndicat_id\"\r\n\r\n{syndicat}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"category_id\"\r\n\r\n{category}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"expiration_dates\"\r\n\r\n2030-01-31\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"documents\"; filename=\"contrat.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\ncontract bytes\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/documents")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();
    let (status, body) = app.json(request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Documents importés avec succès.");

    let admin_id = app.service.list_users().unwrap()[0].user_id;
    let page = app.service.list_documents(admin_id, syndicat, category, 1).unwrap();
    assert_eq!(page.files[0].file_name, "contrat.pdf");
    assert!(page.files[0].expiration_date.is_some());
}

#[tokio::test]
async fn test_reset_link_and_token_check() {
    let app = make_test_app();
    app.admin("admin@syndic.test");

    let (status, body) = app
        .json(json_request(Method::POST, "/authentication/reset-pwd-link", None, json!({
            "email": "nobody@syndic.test",
        })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], messages::NO_ACCOUNT_FOR_EMAIL);
    assert!(app.outbox.sent().is_empty());

    let (status, _) = app
        .json(json_request(Method::POST, "/authentication/reset-pwd-link", None, json!({
            "email": "admin@syndic.test",
        })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.outbox.sent().len(), 1);

    let (status, body) = app
        .json(get("/authentication/check-token-reset-pwd/garbage", None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let app = make_test_app();
    app.admin("admin@syndic.test");
    let cookie = app.login("admin@syndic.test").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/authentication/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));

    let (status, _) = app.json(get("/authentication/check-admin", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
