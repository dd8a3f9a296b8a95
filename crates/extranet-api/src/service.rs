//! API server - builds the router and runs it until shutdown.

use axum::routing::get;
use axum::Router;
use extranet_core::ExtranetService;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::config::{ApiConfig, SessionConfig};
use crate::domain::error::ServerError;
use crate::middleware::{create_cors_layer, TracingLayer};
use crate::routes::{auth, documents, settings};
use crate::session::{CookieSigner, MemorySessionStore, SessionStore};

/// How often expired in-memory sessions are dropped.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub extranet: ExtranetService,
    pub sessions: Arc<dyn SessionStore>,
    pub signer: CookieSigner,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(extranet: ExtranetService, sessions: Arc<dyn SessionStore>, config: ApiConfig) -> Self {
        let signer = CookieSigner::new(
            config.session.secret.as_bytes(),
            config.session.ttl(),
            config.session.cookie_secure,
        );
        Self {
            extranet,
            sessions,
            signer,
            config: Arc::new(config),
        }
    }
}

/// Builds the full router: `/authentication`, `/settings`, `/documents`.
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.limits.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .nest("/authentication", auth::router())
        .nest("/settings", settings::router(max_upload_bytes))
        .nest("/documents", documents::router(max_upload_bytes))
        .layer(TracingLayer::new())
        .layer(create_cors_layer(&state.config.cors))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

/// Opens the configured session store.
///
/// Redis when a URL is set and the `redis` feature is built in; in memory
/// otherwise, with a background task purging expired sessions.
pub async fn open_session_store(config: &SessionConfig) -> Result<Arc<dyn SessionStore>, ServerError> {
    #[cfg(feature = "redis")]
    if let Some(url) = config.redis_url.as_deref() {
        let store = crate::session::RedisSessionStore::connect(url, config.ttl()).await?;
        info!("Sessions stored in Redis");
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "redis"))]
    if config.redis_url.is_some() {
        tracing::warn!("Redis URL configured but the redis feature is disabled; sessions kept in memory");
    }

    let store = MemorySessionStore::new(config.ttl());
    let purged = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = purged.purge_expired();
            if removed > 0 {
                debug!(removed, "expired sessions purged");
            }
        }
    });
    info!("Sessions stored in memory");
    Ok(Arc::new(store))
}

/// HTTP server of the extranet
pub struct ApiServer {
    addr: std::net::SocketAddr,
    router: Router,
}

impl ApiServer {
    /// Validates the configuration and opens the session store.
    pub async fn new(config: ApiConfig, extranet: ExtranetService) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let sessions = open_session_store(&config.session).await?;
        let addr = config.http_addr();
        let router = build_router(AppState::new(extranet, sessions, config));

        Ok(Self { addr, router })
    }

    /// Serves until `shutdown` completes; in-flight requests are drained.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {e}", self.addr)))?;
        info!(addr = %self.addr, "Starting HTTP server");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
