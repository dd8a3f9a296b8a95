//! # Extranet Service - Helper Methods
//!
//! Lookups and access checks shared by the port implementations.

use std::collections::BTreeMap;

use rusqlite::Connection;

use super::ExtranetService;
use crate::adapters::sqlite::{categories, syndicats, users};
use crate::domain::entities::{Category, CategoryId, Syndicat, SyndicatId, User, UserId};
use crate::domain::errors::{messages, ExtranetError, ExtranetResult};

pub(crate) const SYNDICAT_NOT_FOUND: &str = "Syndicat introuvable.";
pub(crate) const CATEGORY_NOT_FOUND: &str = "Catégorie introuvable.";

impl ExtranetService {
    /// Loads the caller. A session pointing at a deleted account is no
    /// longer a valid login.
    pub(crate) fn require_user(conn: &Connection, user_id: UserId) -> ExtranetResult<User> {
        users::find_by_id(conn, user_id)?
            .ok_or_else(|| ExtranetError::unauthorized(messages::USER_NOT_FOUND))
    }

    /// Administrators see every syndicat; residents only their own.
    pub(crate) fn authorize_syndicat(
        conn: &Connection,
        user_id: UserId,
        syndicat_id: SyndicatId,
    ) -> ExtranetResult<User> {
        let user = Self::require_user(conn, user_id)?;
        if user.is_admin() || syndicats::is_member(conn, user_id, syndicat_id)? {
            Ok(user)
        } else {
            Err(ExtranetError::forbidden(messages::SYNDICAT_FORBIDDEN))
        }
    }

    /// Resolves an active syndicat and category. With `published_only`, the
    /// category must also be visible in that syndicat.
    pub(crate) fn resolve_location(
        conn: &Connection,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        published_only: bool,
    ) -> ExtranetResult<(Syndicat, Category)> {
        let not_found = || ExtranetError::not_found(messages::SYNDICAT_OR_CATEGORY_NOT_FOUND);

        let syndicat = syndicats::find_by_id(conn, syndicat_id)?
            .filter(|s| !s.is_deleted)
            .ok_or_else(not_found)?;
        let category = categories::find_by_id(conn, category_id)?
            .filter(|c| !c.is_deleted)
            .ok_or_else(not_found)?;

        if published_only && !syndicats::has_visible_category(conn, syndicat_id, category_id)? {
            return Err(not_found());
        }
        Ok((syndicat, category))
    }

    pub(crate) fn active_syndicat(conn: &Connection, syndicat_id: SyndicatId) -> ExtranetResult<Syndicat> {
        syndicats::find_by_id(conn, syndicat_id)?
            .filter(|s| !s.is_deleted)
            .ok_or_else(|| ExtranetError::not_found(SYNDICAT_NOT_FOUND))
    }

    /// Active categories for the given ids, deduplicated, in id order.
    pub(crate) fn active_categories(
        conn: &Connection,
        category_ids: &[CategoryId],
    ) -> ExtranetResult<Vec<Category>> {
        let mut found = BTreeMap::new();
        for id in category_ids {
            let category = categories::find_by_id(conn, *id)?
                .filter(|c| !c.is_deleted)
                .ok_or_else(|| ExtranetError::not_found(CATEGORY_NOT_FOUND))?;
            found.insert(category.category_id, category);
        }
        Ok(found.into_values().collect())
    }

    /// Creates `<syndicat>/<category>/archive/` for each category.
    pub(crate) fn create_folders(&self, syndicat: &str, categories: &[Category]) -> ExtranetResult<()> {
        for category in categories {
            self.documents.create_category_dirs(syndicat, &category.name)?;
        }
        Ok(())
    }
}
