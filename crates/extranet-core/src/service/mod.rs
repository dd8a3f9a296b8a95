//! # Extranet Service
//!
//! The application service behind every inbound port.
//!
//! ## Architecture
//!
//! This service:
//! 1. Implements `AuthApi`, `SettingsApi`, `DocumentsApi` and `ExpirySweepApi`
//! 2. Keeps SQL rows and the document tree in step inside one transaction
//! 3. Uses dependency injection for storage, mail, hashing and time
//!
//! Every method is blocking; async callers run them on a blocking pool.

mod auth;
mod documents;
mod helpers;
mod settings;
mod sweep;

use std::fmt;
use std::sync::Arc;

use chrono::Duration;

use crate::adapters::sqlite::Database;
use crate::domain::credentials::ResetTokens;
use crate::ports::outbound::{Clock, DocumentStore, Mailer, PasswordHasher};

/// Lifetime of a password-reset link.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

/// Service settings that do not come from a port.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Base URL of the frontend; reset links and welcome mails point here.
    pub frontend_url: String,
    /// Visible recipient of the expiry notice (administrators are in Bcc).
    pub expiry_notice_to: String,
    /// HMAC secret for reset tokens.
    pub reset_secret: String,
    pub reset_token_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            expiry_notice_to: "noreply@localhost".to_string(),
            reset_secret: String::new(),
            reset_token_ttl: Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("frontend_url", &self.frontend_url)
            .field("expiry_notice_to", &self.expiry_notice_to)
            .field("reset_secret", &"<redacted>")
            .field("reset_token_ttl", &self.reset_token_ttl)
            .finish()
    }
}

/// Dependencies for [`ExtranetService`].
pub struct ExtranetDependencies {
    pub database: Database,
    pub documents: Arc<dyn DocumentStore>,
    pub mailer: Arc<dyn Mailer>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

/// The extranet application service. Cheap to clone; clones share every
/// dependency.
#[derive(Clone)]
pub struct ExtranetService {
    pub(crate) db: Database,
    pub(crate) documents: Arc<dyn DocumentStore>,
    pub(crate) mailer: Arc<dyn Mailer>,
    pub(crate) hasher: Arc<dyn PasswordHasher>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) tokens: ResetTokens,
    pub(crate) config: ServiceConfig,
}

impl ExtranetService {
    pub fn new(deps: ExtranetDependencies, config: ServiceConfig) -> Self {
        let tokens = ResetTokens::new(config.reset_secret.as_bytes(), config.reset_token_ttl);
        Self {
            db: deps.database,
            documents: deps.documents,
            mailer: deps.mailer,
            hasher: deps.hasher,
            clock: deps.clock,
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub(crate) fn frontend_base(&self) -> &str {
        self.config.frontend_url.trim_end_matches('/')
    }
}
