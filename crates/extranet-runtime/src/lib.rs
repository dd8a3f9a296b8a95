//! # Copro Extranet Runtime
//!
//! Wiring of the extranet: configuration, adapters, HTTP server and the
//! daily expiry sweep.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `EXTRANET_*` variables and validate it
//! 2. Open the SQLite database (migrations run on open)
//! 3. Build the service with the configured mailer and hasher
//! 4. Start the sweep scheduler and the HTTP server
//! 5. On Ctrl+C / SIGTERM, drain requests and stop the scheduler

pub mod config;
pub mod scheduler;

use std::sync::Arc;

use anyhow::{Context, Result};
use extranet_core::{
    BcryptHasher, Database, ExtranetDependencies, ExtranetService, LocalDocumentStore, LogMailer,
    Mailer, ServiceConfig, SmtpMailer, SystemClock,
};
use tracing::info;

use crate::config::{MailTransport, RuntimeConfig};

/// Builds the mailer for the configured transport.
pub fn build_mailer(config: &RuntimeConfig) -> Result<Arc<dyn Mailer>> {
    Ok(match config.mail.transport {
        MailTransport::Log => {
            info!("Mails are logged, not delivered");
            Arc::new(LogMailer)
        }
        MailTransport::Smtp => {
            let mailer = SmtpMailer::new(&config.mail.smtp_settings())
                .context("failed to configure SMTP transport")?;
            info!(host = %config.mail.smtp_host, port = config.mail.smtp_port, "Mails delivered over SMTP");
            Arc::new(mailer)
        }
    })
}

/// Opens storage and builds the application service.
pub fn build_service(config: &RuntimeConfig) -> Result<ExtranetService> {
    let database = Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;

    let deps = ExtranetDependencies {
        database,
        documents: Arc::new(LocalDocumentStore::new(
            config.documents_root.clone(),
            config.accounts_dir.clone(),
        )),
        mailer: build_mailer(config)?,
        hasher: Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        clock: Arc::new(SystemClock),
    };

    let service_config = ServiceConfig {
        frontend_url: config.frontend_url.clone(),
        expiry_notice_to: config.mail.expiry_notice_to().to_string(),
        reset_secret: config.jwt_secret.clone(),
        ..ServiceConfig::default()
    };

    Ok(ExtranetService::new(deps, service_config))
}
