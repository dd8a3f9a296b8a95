//! # Inbound Ports (Driving Ports)
//!
//! The operations the HTTP layer and the runtime binary drive.
//!
//! Authorization that depends only on the caller's role (administrator
//! routes) is enforced by the caller; rules that depend on data, such as a
//! resident's syndicat memberships, are enforced here.

use chrono::{DateTime, Utc};

use crate::domain::entities::{
    CategoryCreation, CategoryId, CategorySummary, CreatedAdmin, DocumentContent, DocumentPage,
    ImportSummary, LoginOutcome, Profile, ResetRequest, SweepReport, SyndicatId,
    SyndicatSummary, SyndicatWithCategories, UploadedDocument, UserId, UserUpdate,
    UserWithSyndicats,
};
use crate::domain::errors::ExtranetResult;

/// Login, profile and password flows.
pub trait AuthApi {
    /// Checks credentials and records the login.
    ///
    /// ## Errors
    ///
    /// - `Unauthorized`: unknown email or wrong password (same message for both)
    fn login(&self, email: &str, password: &str) -> ExtranetResult<LoginOutcome>;

    fn profile(&self, user_id: UserId) -> ExtranetResult<Profile>;

    /// Whether the user still has to replace the generated password.
    fn first_login_status(&self, user_id: UserId) -> ExtranetResult<bool>;

    fn is_admin(&self, user_id: UserId) -> ExtranetResult<bool>;

    /// Replaces the generated password.
    ///
    /// ## Errors
    ///
    /// - `Unauthorized`: unknown user, or the new password equals the current one
    fn change_first_password(&self, user_id: UserId, password: &str) -> ExtranetResult<()>;

    /// Emails a reset link when an account uses `email`.
    fn request_password_reset(&self, email: &str) -> ExtranetResult<ResetRequest>;

    /// Consumes a reset token.
    ///
    /// ## Errors
    ///
    /// - `Unauthorized`: expired, tampered or already used token
    fn reset_password(&self, token: &str, new_password: &str) -> ExtranetResult<()>;

    /// Checks a reset token without consuming it.
    fn check_reset_token(&self, token: &str) -> ExtranetResult<()>;
}

/// Administration of accounts, syndicats and categories.
pub trait SettingsApi {
    fn list_users(&self) -> ExtranetResult<Vec<UserWithSyndicats>>;

    fn users_template(&self) -> String;

    fn export_users(&self) -> ExtranetResult<Vec<u8>>;

    /// Creates every account of a sheet, or none of them.
    fn import_accounts(&self, sheet_name: &str, bytes: &[u8]) -> ExtranetResult<ImportSummary>;

    fn update_user(&self, update: UserUpdate) -> ExtranetResult<()>;

    fn delete_user(&self, user_id: UserId) -> ExtranetResult<()>;

    /// Bootstraps an administrator. A password is generated when none is given.
    fn create_admin(
        &self,
        email: &str,
        first_name: &str,
        surname: &str,
        password: Option<&str>,
    ) -> ExtranetResult<CreatedAdmin>;

    fn list_syndicats(&self) -> ExtranetResult<Vec<SyndicatWithCategories>>;

    /// Creates a syndicat, or reactivates a soft-deleted one of the same name.
    ///
    /// ## Errors
    ///
    /// - `Conflict`: an active syndicat already has this name
    fn create_syndicat(&self, name: &str, category_ids: &[CategoryId])
        -> ExtranetResult<SyndicatId>;

    fn update_syndicat(&self, syndicat_id: SyndicatId, category_ids: &[CategoryId])
        -> ExtranetResult<()>;

    fn delete_syndicat(&self, syndicat_id: SyndicatId) -> ExtranetResult<()>;

    fn list_categories(&self) -> ExtranetResult<Vec<CategorySummary>>;

    fn create_category(&self, name: &str) -> ExtranetResult<CategoryCreation>;

    fn delete_category(&self, category_id: CategoryId) -> ExtranetResult<()>;
}

/// Document browsing and publishing.
pub trait DocumentsApi {
    fn accessible_syndicats(&self, user_id: UserId) -> ExtranetResult<Vec<SyndicatSummary>>;

    fn syndicat_categories(
        &self,
        user_id: UserId,
        syndicat_id: SyndicatId,
    ) -> ExtranetResult<Vec<CategorySummary>>;

    fn list_documents(
        &self,
        user_id: UserId,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        page: usize,
    ) -> ExtranetResult<DocumentPage>;

    fn open_document(
        &self,
        user_id: UserId,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        file_name: &str,
    ) -> ExtranetResult<DocumentContent>;

    fn archive_document(
        &self,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        file_name: &str,
    ) -> ExtranetResult<()>;

    /// Stores every document and its row, or none of them. Returns the
    /// number of documents written.
    fn upload_documents(
        &self,
        uploader_id: UserId,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        documents: Vec<UploadedDocument>,
    ) -> ExtranetResult<usize>;

    fn update_syndicat_infos(&self, syndicat_id: SyndicatId, infos: Option<String>)
        -> ExtranetResult<()>;

    fn set_expiration_date(
        &self,
        uploader_id: UserId,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        file_name: &str,
        expiration_date: Option<DateTime<Utc>>,
    ) -> ExtranetResult<()>;
}

/// Periodic expiry check.
pub trait ExpirySweepApi {
    /// Flags every past-due document and notifies the administrators.
    fn sweep_expired(&self, now: DateTime<Utc>) -> ExtranetResult<SweepReport>;
}
