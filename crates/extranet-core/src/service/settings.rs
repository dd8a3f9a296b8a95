//! # Extranet Service - SettingsApi Implementation

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use super::helpers::{CATEGORY_NOT_FOUND, SYNDICAT_NOT_FOUND};
use super::ExtranetService;
use crate::adapters::sqlite::{categories, syndicats, users};
use crate::domain::accounts::{self, duplicate_emails, parse_account_sheet};
use crate::domain::credentials::{generate_password, GENERATED_PASSWORD_LEN};
use crate::domain::entities::{
    CategoryCreation, CategoryId, CategorySummary, CreatedAdmin, ImportSummary, NamedRef, NewUser,
    Role, SyndicatId, SyndicatWithCategories, UserId, UserUpdate, UserWithSyndicats,
};
use crate::domain::errors::{messages, ExtranetError, ExtranetResult};
use crate::domain::mail;
use crate::domain::naming::validate_segment;
use crate::ports::inbound::SettingsApi;

const INVALID_EMAIL: &str = "L'adresse mail n'est pas valide.";
const EMPTY_SHEET: &str = "Le fichier ne contient aucun compte.";

fn require_email(email: &str) -> ExtranetResult<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ExtranetError::validation(INVALID_EMAIL));
    }
    Ok(())
}

fn group_by<K: std::hash::Hash + Eq>(pairs: Vec<(K, NamedRef)>) -> HashMap<K, Vec<NamedRef>> {
    let mut grouped: HashMap<K, Vec<NamedRef>> = HashMap::new();
    for (key, named) in pairs {
        grouped.entry(key).or_default().push(named);
    }
    grouped
}

/// A sheet row with its generated credentials.
struct PreparedAccount {
    row: accounts::AccountRow,
    password: String,
    password_hash: String,
}

impl SettingsApi for ExtranetService {
    fn list_users(&self) -> ExtranetResult<Vec<UserWithSyndicats>> {
        let (all, links) = self
            .db
            .read(|conn| Ok((users::list_all(conn)?, users::syndicat_links(conn)?)))?;
        let mut links = group_by(links);

        Ok(all
            .into_iter()
            .map(|user| UserWithSyndicats {
                syndicats: links.remove(&user.user_id).unwrap_or_default(),
                user_id: user.user_id,
                civilite: user.civilite,
                first_name: user.first_name,
                surname: user.surname,
                email: user.email,
                role: user.role,
            })
            .collect())
    }

    fn users_template(&self) -> String {
        accounts::template_csv()
    }

    fn export_users(&self) -> ExtranetResult<Vec<u8>> {
        let (all, links) = self
            .db
            .read(|conn| Ok((users::list_all(conn)?, users::syndicat_links(conn)?)))?;
        let mut links = group_by(links);

        let rows: Vec<_> = all
            .into_iter()
            .map(|user| {
                let names = links
                    .remove(&user.user_id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|s| s.name)
                    .collect();
                (user, names)
            })
            .collect();

        accounts::export_csv(&rows)
    }

    fn import_accounts(&self, sheet_name: &str, bytes: &[u8]) -> ExtranetResult<ImportSummary> {
        if bytes.is_empty() {
            return Err(ExtranetError::validation(messages::NO_FILE_UPLOADED));
        }
        validate_segment(sheet_name, "du fichier")?;

        let active: HashSet<String> = self
            .db
            .read(syndicats::list_active)?
            .into_iter()
            .map(|s| s.name)
            .collect();
        let rows = parse_account_sheet(bytes, &active)?;
        if rows.is_empty() {
            return Err(ExtranetError::validation(EMPTY_SHEET));
        }

        let duplicates = duplicate_emails(&rows);
        if !duplicates.is_empty() {
            return Err(ExtranetError::validation(format!(
                "Il y a des mails doublons dans votre fichier ({}), veuillez corriger cela s'il vous plait",
                duplicates.join(", ")
            )));
        }

        let emails: Vec<String> = rows.iter().map(|r| r.email.clone()).collect();
        let existing = self
            .db
            .read(|conn| users::existing_emails(conn, &emails))?;
        if !existing.is_empty() {
            return Err(ExtranetError::validation(format!(
                "Certains emails existent déjà dans la base de données ({}), veuillez corriger cela s'il vous plaît.",
                existing.join(", ")
            )));
        }

        let prepared = rows
            .into_iter()
            .map(|row| {
                let password = generate_password(GENERATED_PASSWORD_LEN);
                let password_hash = self.hasher.hash(&password)?;
                Ok(PreparedAccount {
                    row,
                    password,
                    password_hash,
                })
            })
            .collect::<ExtranetResult<Vec<_>>>()?;

        let now = self.clock.now();
        self.db.transaction(|tx| {
            for account in &prepared {
                let row = &account.row;
                let user_id = users::insert(
                    tx,
                    &NewUser {
                        email: row.email.clone(),
                        password_hash: account.password_hash.clone(),
                        civilite: row.civilite,
                        surname: row.surname.clone(),
                        first_name: row.first_name.clone(),
                        role: row.role,
                    },
                    now,
                )?;
                for name in &row.syndicats {
                    let syndicat = syndicats::find_by_name(tx, name)?
                        .filter(|s| !s.is_deleted)
                        .ok_or_else(|| ExtranetError::not_found(SYNDICAT_NOT_FOUND))?;
                    users::link_syndicat(tx, user_id, syndicat.syndicat_id)?;
                }
            }
            Ok(())
        })?;

        if let Err(err) = self.documents.store_account_sheet(sheet_name, bytes) {
            warn!(sheet = sheet_name, error = %err, "could not keep imported account sheet");
        }

        let login_url = self.frontend_base().to_string();
        let mut mail_failures = 0;
        for account in &prepared {
            let message = mail::new_account(
                &account.row.email,
                &account.row.first_name,
                &account.password,
                &login_url,
            );
            if let Err(err) = self.mailer.send(&message) {
                mail_failures += 1;
                warn!(email = %account.row.email, error = %err, "welcome mail not delivered");
            }
        }

        info!(created = prepared.len(), mail_failures, "accounts imported");
        Ok(ImportSummary {
            created: prepared.len(),
            mail_failures,
        })
    }

    fn update_user(&self, update: UserUpdate) -> ExtranetResult<()> {
        require_email(&update.email)?;
        let now = self.clock.now();

        self.db.transaction(|tx| {
            for syndicat_id in &update.syndicat_ids {
                Self::active_syndicat(tx, *syndicat_id)?;
            }
            if !users::update(tx, &update, now)? {
                return Err(ExtranetError::not_found(messages::USER_NOT_FOUND));
            }
            users::replace_syndicats(tx, update.user_id, &update.syndicat_ids)
        })?;

        info!(user_id = update.user_id, "user updated");
        Ok(())
    }

    fn delete_user(&self, user_id: UserId) -> ExtranetResult<()> {
        self.db.transaction(|tx| {
            if !users::delete(tx, user_id)? {
                return Err(ExtranetError::not_found(messages::USER_NOT_FOUND));
            }
            Ok(())
        })?;

        info!(user_id, "user deleted");
        Ok(())
    }

    fn create_admin(
        &self,
        email: &str,
        first_name: &str,
        surname: &str,
        password: Option<&str>,
    ) -> ExtranetResult<CreatedAdmin> {
        require_email(email)?;
        let generated = match password {
            Some(p) if !p.is_empty() => None,
            _ => Some(generate_password(GENERATED_PASSWORD_LEN)),
        };
        let password = generated.as_deref().or(password).unwrap_or_default();
        let password_hash = self.hasher.hash(password)?;

        let now = self.clock.now();
        let user_id = self.db.transaction(|tx| {
            users::insert(
                tx,
                &NewUser {
                    email: email.to_string(),
                    password_hash,
                    civilite: None,
                    surname: surname.to_string(),
                    first_name: first_name.to_string(),
                    role: Role::Admin,
                },
                now,
            )
        })?;

        info!(user_id, "administrator created");
        Ok(CreatedAdmin {
            user_id,
            generated_password: generated,
        })
    }

    fn list_syndicats(&self) -> ExtranetResult<Vec<SyndicatWithCategories>> {
        let (active, links) = self
            .db
            .read(|conn| Ok((syndicats::list_active(conn)?, syndicats::visible_links(conn)?)))?;
        let mut links = group_by(links);

        Ok(active
            .into_iter()
            .map(|s| SyndicatWithCategories {
                categories_syndicats: links.remove(&s.syndicat_id).unwrap_or_default(),
                syndicat_id: s.syndicat_id,
                name: s.name,
            })
            .collect())
    }

    fn create_syndicat(
        &self,
        name: &str,
        category_ids: &[CategoryId],
    ) -> ExtranetResult<SyndicatId> {
        let name = name.trim();
        validate_segment(name, "du syndicat")?;
        let now = self.clock.now();

        let syndicat_id = self.db.transaction(|tx| {
            let syndicat_id = match syndicats::find_by_name(tx, name)? {
                Some(existing) if !existing.is_deleted => {
                    return Err(ExtranetError::conflict(syndicats::NAME_TAKEN));
                }
                Some(existing) => {
                    syndicats::reactivate(tx, existing.syndicat_id, now)?;
                    existing.syndicat_id
                }
                None => syndicats::insert(tx, name, now)?,
            };

            let linked = Self::active_categories(tx, category_ids)?;
            let ids: Vec<CategoryId> = linked.iter().map(|c| c.category_id).collect();
            syndicats::link_categories(tx, syndicat_id, &ids)?;
            self.create_folders(name, &linked)?;
            Ok(syndicat_id)
        })?;

        info!(syndicat_id, name, "syndicat created");
        Ok(syndicat_id)
    }

    fn update_syndicat(
        &self,
        syndicat_id: SyndicatId,
        category_ids: &[CategoryId],
    ) -> ExtranetResult<()> {
        self.db.transaction(|tx| {
            let syndicat = Self::active_syndicat(tx, syndicat_id)?;
            let linked = Self::active_categories(tx, category_ids)?;
            let ids: Vec<CategoryId> = linked.iter().map(|c| c.category_id).collect();

            syndicats::clear_categories(tx, syndicat_id)?;
            syndicats::link_categories(tx, syndicat_id, &ids)?;
            self.create_folders(&syndicat.name, &linked)
        })?;

        info!(syndicat_id, categories = category_ids.len(), "syndicat updated");
        Ok(())
    }

    fn delete_syndicat(&self, syndicat_id: SyndicatId) -> ExtranetResult<()> {
        let now = self.clock.now();
        self.db.transaction(|tx| {
            Self::active_syndicat(tx, syndicat_id)?;
            syndicats::clear_categories(tx, syndicat_id)?;
            syndicats::mark_deleted(tx, syndicat_id, now)
        })?;

        info!(syndicat_id, "syndicat deleted");
        Ok(())
    }

    fn list_categories(&self) -> ExtranetResult<Vec<CategorySummary>> {
        self.db.read(categories::list_active)
    }

    fn create_category(&self, name: &str) -> ExtranetResult<CategoryCreation> {
        let name = name.trim();
        validate_segment(name, "de la catégorie")?;
        let now = self.clock.now();

        let outcome = self.db.transaction(|tx| match categories::find_by_name(tx, name)? {
            Some(existing) if !existing.is_deleted => {
                Ok(CategoryCreation::AlreadyActive(existing.category_id))
            }
            Some(existing) => {
                categories::reactivate(tx, existing.category_id)?;
                Ok(CategoryCreation::Reactivated(existing.category_id))
            }
            None => Ok(CategoryCreation::Created(categories::insert(tx, name, now)?)),
        })?;

        info!(name, outcome = ?outcome, "category created");
        Ok(outcome)
    }

    fn delete_category(&self, category_id: CategoryId) -> ExtranetResult<()> {
        self.db.transaction(|tx| {
            if !categories::mark_deleted(tx, category_id)? {
                return Err(ExtranetError::not_found(CATEGORY_NOT_FOUND));
            }
            Ok(())
        })?;

        info!(category_id, "category deleted");
        Ok(())
    }
}
