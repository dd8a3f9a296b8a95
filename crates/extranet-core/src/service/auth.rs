//! # Extranet Service - AuthApi Implementation

use tracing::{info, warn};

use super::ExtranetService;
use crate::adapters::sqlite::users;
use crate::domain::credentials::{password_fingerprint, VerifiedReset};
use crate::domain::entities::{LoginOutcome, Profile, ResetRequest, User, UserId};
use crate::domain::errors::{messages, ExtranetError, ExtranetResult};
use crate::domain::mail;
use crate::ports::inbound::AuthApi;

const EMPTY_PASSWORD: &str = "Le mot de passe ne peut pas être vide.";

fn require_password(password: &str) -> ExtranetResult<()> {
    if password.is_empty() {
        return Err(ExtranetError::validation(EMPTY_PASSWORD));
    }
    Ok(())
}

impl ExtranetService {
    /// Checks signature, expiry and that the password has not changed since
    /// the token was issued.
    fn verify_reset_token(&self, token: &str, error: &'static str) -> ExtranetResult<User> {
        let now = self.clock.now();
        let VerifiedReset {
            user_id,
            fingerprint,
        } = self
            .tokens
            .verify(token, now)
            .map_err(|_| ExtranetError::unauthorized(error))?;

        let user = self
            .db
            .read(|conn| users::find_by_id(conn, user_id))?
            .ok_or_else(|| ExtranetError::unauthorized(error))?;

        if password_fingerprint(&user.password_hash) != fingerprint {
            return Err(ExtranetError::unauthorized(error));
        }
        Ok(user)
    }
}

impl AuthApi for ExtranetService {
    fn login(&self, email: &str, password: &str) -> ExtranetResult<LoginOutcome> {
        let bad_credentials = || ExtranetError::unauthorized(messages::BAD_CREDENTIALS);

        let user = self
            .db
            .read(|conn| users::find_by_email(conn, email))?
            .ok_or_else(bad_credentials)?;

        match self.hasher.verify(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(bad_credentials()),
            Err(err) => {
                warn!(user_id = user.user_id, error = %err, "stored password hash is unreadable");
                return Err(bad_credentials());
            }
        }

        let now = self.clock.now();
        self.db
            .transaction(|tx| users::record_login(tx, user.user_id, now))?;

        info!(user_id = user.user_id, "user logged in");
        Ok(LoginOutcome {
            user_id: user.user_id,
            first_login: user.first_login,
        })
    }

    fn profile(&self, user_id: UserId) -> ExtranetResult<Profile> {
        let user = self.db.read(|conn| Self::require_user(conn, user_id))?;
        Ok(Profile {
            first_name: user.first_name,
            surname: user.surname,
            role: user.role,
            civilite: user.civilite,
        })
    }

    fn first_login_status(&self, user_id: UserId) -> ExtranetResult<bool> {
        let user = self.db.read(|conn| Self::require_user(conn, user_id))?;
        Ok(user.first_login)
    }

    fn is_admin(&self, user_id: UserId) -> ExtranetResult<bool> {
        let user = self.db.read(|conn| Self::require_user(conn, user_id))?;
        Ok(user.is_admin())
    }

    fn change_first_password(&self, user_id: UserId, password: &str) -> ExtranetResult<()> {
        require_password(password)?;
        let user = self.db.read(|conn| Self::require_user(conn, user_id))?;

        if self.hasher.verify(password, &user.password_hash)? {
            return Err(ExtranetError::unauthorized(messages::SAME_PASSWORD));
        }

        let hash = self.hasher.hash(password)?;
        let now = self.clock.now();
        self.db
            .transaction(|tx| users::set_password(tx, user_id, &hash, now))?;

        info!(user_id, "first password replaced");
        Ok(())
    }

    fn request_password_reset(&self, email: &str) -> ExtranetResult<ResetRequest> {
        let Some(user) = self.db.read(|conn| users::find_by_email(conn, email))? else {
            return Ok(ResetRequest::NoAccount);
        };

        let token = self
            .tokens
            .issue(user.user_id, &user.password_hash, self.clock.now())?;
        let link = format!("{}/reset-pwd/{}", self.frontend_base(), token);

        self.mailer
            .send(&mail::password_reset(&user.email, &user.first_name, &link))?;

        info!(user_id = user.user_id, "password reset link sent");
        Ok(ResetRequest::Sent)
    }

    fn reset_password(&self, token: &str, new_password: &str) -> ExtranetResult<()> {
        require_password(new_password)?;
        let user = self.verify_reset_token(token, messages::LINK_EXPIRED)?;
        let hash = self.hasher.hash(new_password)?;
        let now = self.clock.now();

        self.db.transaction(|tx| {
            // The password may have changed while hashing; the token must
            // still match the stored hash at write time.
            let current = users::find_by_id(tx, user.user_id)?
                .ok_or_else(|| ExtranetError::unauthorized(messages::LINK_EXPIRED))?;
            if current.password_hash != user.password_hash {
                return Err(ExtranetError::unauthorized(messages::LINK_EXPIRED));
            }
            users::set_password(tx, user.user_id, &hash, now)
        })?;

        info!(user_id = user.user_id, "password reset");
        Ok(())
    }

    fn check_reset_token(&self, token: &str) -> ExtranetResult<()> {
        self.verify_reset_token(token, messages::TOKEN_INVALID)
            .map(|_| ())
    }
}
