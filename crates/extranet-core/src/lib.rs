//! # Copro Extranet Core
//!
//! Domain, persistence and application service of the document extranet a
//! property-management company ("syndic") offers to its co-owners.
//!
//! ## Model
//!
//! ```text
//! users ──< users_syndicats >── syndicats ──< syndicats_categories >── categories
//!                                   │                                      │
//!                                   └──────────────< files >───────────────┘
//! ```
//!
//! Document bytes live on disk under `<root>/<syndicat>/<category>/`; the
//! `files` table only carries expiry metadata. Every operation that touches
//! both keeps them in step inside one SQL transaction.
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Scoped access | A resident only reaches the syndicats they belong to |
//! | Soft delete | Syndicats and categories are flagged, never dropped |
//! | All or nothing | A bulk import creates every account of the sheet or none |
//! | Single-use reset | A reset token dies as soon as the password changes |
//! | Safe paths | Names used on disk are single path components |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, errors, CSV sheets, tokens, mail bodies
//! - `ports/` - Port traits (inbound API, outbound SPI)
//! - `adapters/` - SQLite, filesystem, SMTP and bcrypt implementations
//! - `service/` - Application service implementing the inbound ports
//!
//! ## Usage
//!
//! ```ignore
//! use extranet_core::{ExtranetService, ExtranetDependencies, ServiceConfig, AuthApi};
//!
//! let service = ExtranetService::new(deps, ServiceConfig::default());
//! let outcome = service.login("alice@example.fr", "s3cret!")?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{BcryptHasher, Database, LocalDocumentStore, LogMailer, SmtpSettings};
#[cfg(feature = "smtp")]
pub use adapters::SmtpMailer;
pub use domain::entities::*;
pub use domain::errors::{messages, ExtranetError, ExtranetResult};
pub use ports::inbound::{AuthApi, DocumentsApi, ExpirySweepApi, SettingsApi};
pub use ports::outbound::{
    Clock, DocumentStore, FixedClock, Mailer, OutboxMailer, PasswordHasher, SystemClock,
};
pub use service::{ExtranetDependencies, ExtranetService, ServiceConfig};
