//! # Adapters Module
//!
//! Production implementations of the outbound ports.
//!
//! ## Modules
//!
//! - `sqlite`: relational rows (users, syndicats, categories, files)
//! - `filesystem`: document tree and kept account sheets
//! - `mail`: log and SMTP mailers
//! - `hashing`: bcrypt password hasher

pub mod filesystem;
pub mod hashing;
pub mod mail;
pub mod sqlite;

pub use filesystem::LocalDocumentStore;
pub use hashing::{BcryptHasher, DEFAULT_BCRYPT_COST};
#[cfg(feature = "smtp")]
pub use mail::SmtpMailer;
pub use mail::{LogMailer, SmtpSettings};
pub use sqlite::Database;
