//! # Domain Entities
//!
//! Rows of the extranet schema and the read models the service hands out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::ExtranetError;

pub type UserId = i64;
pub type SyndicatId = i64;
pub type CategoryId = i64;
pub type FileId = i64;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Maps the `Rôle` column of an account sheet. Only the exact
    /// `Administrateur` label grants admin rights.
    pub fn from_sheet_label(label: &str) -> Self {
        if label.trim() == "Administrateur" {
            Role::Admin
        } else {
            Role::User
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ExtranetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(ExtranetError::validation(format!("Rôle inconnu : {other}"))),
        }
    }
}

/// Form of address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Civilite {
    Mr,
    Mme,
}

impl Civilite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Civilite::Mr => "Mr",
            Civilite::Mme => "Mme",
        }
    }
}

impl FromStr for Civilite {
    type Err = ExtranetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Mr" | "M" | "M." => Ok(Civilite::Mr),
            "Mme" => Ok(Civilite::Mme),
            other => Err(ExtranetError::validation(format!(
                "Civilité inconnue : {other}"
            ))),
        }
    }
}

/// Full `users` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub first_login: bool,
    pub civilite: Option<Civilite>,
    pub surname: String,
    pub first_name: String,
    pub role: Role,
    pub login_counter: i64,
    pub last_logged_in: Option<DateTime<Utc>>,
    pub creation_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub civilite: Option<Civilite>,
    pub surname: String,
    pub first_name: String,
    pub role: Role,
}

/// Administrator edit of an account. The syndicat list replaces the
/// existing links.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub user_id: UserId,
    pub civilite: Option<Civilite>,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub role: Role,
    pub syndicat_ids: Vec<SyndicatId>,
}

/// Result of a bulk account import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    /// Welcome mails that could not be delivered.
    pub mail_failures: usize,
}

/// An account created from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAdmin {
    pub user_id: UserId,
    /// Set when the password was generated rather than supplied.
    pub generated_password: Option<String>,
}

/// Outcome of a reset-link request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRequest {
    /// No account uses this address; nothing was sent.
    NoAccount,
    Sent,
}

/// Minimal `{id, name}` pair used in nested listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

/// What the administration screen shows for each account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserWithSyndicats {
    pub user_id: UserId,
    pub civilite: Option<Civilite>,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub role: Role,
    pub syndicats: Vec<NamedRef>,
}

/// What a logged-in user sees about themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub first_name: String,
    pub surname: String,
    pub role: Role,
    pub civilite: Option<Civilite>,
}

/// Result of a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginOutcome {
    pub user_id: UserId,
    pub first_login: bool,
}

/// Full `syndicats` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syndicat {
    pub syndicat_id: SyndicatId,
    pub name: String,
    pub infos: Option<String>,
    pub is_deleted: bool,
}

/// A syndicat as listed to its residents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyndicatSummary {
    pub syndicat_id: SyndicatId,
    pub name: String,
    pub infos: Option<String>,
}

/// A syndicat and the categories it publishes, for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyndicatWithCategories {
    pub syndicat_id: SyndicatId,
    pub name: String,
    pub categories_syndicats: Vec<NamedRef>,
}

/// Full `categories` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub category_id: CategoryId,
    pub name: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category_id: CategoryId,
    pub name: String,
}

/// Outcome of `create_category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryCreation {
    Created(CategoryId),
    Reactivated(CategoryId),
    AlreadyActive(CategoryId),
}

impl CategoryCreation {
    pub fn message(&self) -> &'static str {
        match self {
            CategoryCreation::Created(_) => "La nouvelle catégorie a été créée avec succès !",
            CategoryCreation::Reactivated(_) => {
                "La catégorie existante a été réactivée avec succès !"
            }
            CategoryCreation::AlreadyActive(_) => {
                "La catégorie existe déjà et est déjà active."
            }
        }
    }
}

/// Full `files` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: FileId,
    pub user_id: Option<UserId>,
    pub syndicat_id: SyndicatId,
    pub category_id: CategoryId,
    pub file_name: String,
    pub has_expired: bool,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// One line of a document listing: a file on disk merged with its row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentEntry {
    pub file_name: String,
    pub id: Option<FileId>,
    pub has_expired: bool,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// A page of documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPage {
    pub files: Vec<DocumentEntry>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// Bytes of a document ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContent {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A file posted by an administrator.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// A document flagged by the expiry sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiredDocument {
    pub file_id: FileId,
    pub file_name: String,
    pub syndicat_name: Option<String>,
    pub category_name: Option<String>,
}

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: Vec<ExpiredDocument>,
    /// Administrators the notice was addressed to (0 when nothing was sent).
    pub notified: usize,
}
