//! # Domain Errors
//!
//! Every failure of the extranet service. The first group carries a message
//! meant for the end user; the second wraps infrastructure failures whose
//! details stay in the logs.

use thiserror::Error;

/// Errors that can occur during extranet operations.
#[derive(Debug, Error)]
pub enum ExtranetError {
    /// A syndicat, category, user or file does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Bad credentials, unknown session, invalid reset token.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is known but may not touch this resource.
    #[error("{0}")]
    Forbidden(String),

    /// Input rejected (CSV row, path segment, date...).
    #[error("{0}")]
    Validation(String),

    /// A unique name or email is already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("mail error: {0}")]
    Mail(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExtranetError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn mail(message: impl Into<String>) -> Self {
        Self::Mail(message.into())
    }

    /// Whether the message may be shown to the caller as-is.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Unauthorized(_)
                | Self::Forbidden(_)
                | Self::Validation(_)
                | Self::Conflict(_)
        )
    }

    /// Unique constraint violations surface as `Conflict` instead of a bare
    /// database error.
    pub(crate) fn from_constraint(err: rusqlite::Error, conflict: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::conflict(conflict)
            }
            _ => Self::Database(err),
        }
    }
}

/// Result type for extranet operations.
pub type ExtranetResult<T> = Result<T, ExtranetError>;

/// Messages shared by several operations.
pub mod messages {
    pub const BAD_CREDENTIALS: &str = "Les identifiants fournis sont incorrects.";
    pub const PLEASE_LOG_IN: &str = "Veuillez vous connecter.";
    pub const USER_NOT_FOUND: &str = "Utilisateur introuvable.";
    pub const SAME_PASSWORD: &str = "Le mot de passe doit être différent du précédent";
    pub const LINK_EXPIRED: &str = "Le lien a expiré.";
    pub const TOKEN_INVALID: &str = "Le token est invalide ou a expiré.";
    pub const ADMIN_ONLY: &str = "Vous n'avez pas les droits pour accéder à cette page";
    pub const SYNDICAT_FORBIDDEN: &str = "Vous n'avez pas les droits pour accéder à ce syndicat";
    pub const SYNDICAT_OR_CATEGORY_NOT_FOUND: &str = "Syndicat ou catégorie introuvable.";
    pub const NO_DOCUMENT: &str = "Aucun document trouvé.";
    pub const FILE_NOT_FOUND: &str = "Fichier introuvable.";
    pub const NO_ACCOUNT_FOR_EMAIL: &str =
        "Vous n'avez pas de compte associé à cette adresse mail";
    pub const NO_FILE_UPLOADED: &str = "Vous n'avez pas importé de fichier.";
    pub const SERVER_ERROR: &str = "Une erreur serveur est survenue. Veuillez réessayer";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_kinds() {
        assert!(ExtranetError::not_found("x").is_user_facing());
        assert!(ExtranetError::conflict("x").is_user_facing());
        assert!(!ExtranetError::mail("smtp down").is_user_facing());
        assert!(!ExtranetError::Io(std::io::Error::other("disk")).is_user_facing());
    }

    #[test]
    fn test_constraint_violation_becomes_conflict() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err();
        let mapped = ExtranetError::from_constraint(err, "déjà pris");
        assert!(matches!(mapped, ExtranetError::Conflict(m) if m == "déjà pris"));
    }
}
