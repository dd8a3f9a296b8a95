//! Copro Extranet API - HTTP interface of the document extranet.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    EXTRANET API (axum)                   │
//! ├──────────────────────────────────────────────────────────┤
//! │  /authentication     /settings         /documents        │
//! │        │                 │                  │            │
//! │  ┌─────┴─────────────────┴──────────────────┴─────┐      │
//! │  │      Middleware Stack: CORS → Tracing          │      │
//! │  └─────────────────────┬──────────────────────────┘      │
//! │                        │                                 │
//! │  ┌─────────────────────┴──────────────────────────┐      │
//! │  │   Session guards (signed cookie → store)       │      │
//! │  └─────────────────────┬──────────────────────────┘      │
//! └────────────────────────┼─────────────────────────────────┘
//!                          │ spawn_blocking
//!                          ▼
//!                  extranet-core service
//! ```
//!
//! # Access Levels
//!
//! - **Public**: login, password reset, logout
//! - **Session**: profile, document browsing and download
//! - **Administrator**: `/settings/*`, document upload, archive and metadata
//!
//! # Usage
//!
//! ```ignore
//! use extranet_api::{ApiConfig, ApiServer};
//!
//! let server = ApiServer::new(ApiConfig::default(), extranet).await?;
//! server.run(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod session;

pub use domain::config::{ApiConfig, ConfigError, CorsConfig, HttpConfig, LimitsConfig, SessionConfig};
pub use domain::error::{ApiError, ApiResult, ServerError};
pub use service::{build_router, open_session_store, ApiServer, AppState};
pub use session::{CookieSigner, MemorySessionStore, SessionStore, SESSION_COOKIE};
