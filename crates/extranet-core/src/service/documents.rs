//! # Extranet Service - DocumentsApi Implementation

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::ExtranetService;
use crate::adapters::sqlite::{files, syndicats};
use crate::domain::entities::{
    CategoryId, CategorySummary, DocumentContent, DocumentEntry, DocumentPage, SyndicatId,
    SyndicatSummary, UploadedDocument, UserId,
};
use crate::domain::errors::{messages, ExtranetError, ExtranetResult};
use crate::domain::naming::validate_file_name;
use crate::domain::pagination::{page_slice, PAGE_SIZE};
use crate::ports::inbound::DocumentsApi;

fn is_past(expiration_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expiration_date.is_some_and(|date| date < now)
}

impl DocumentsApi for ExtranetService {
    fn accessible_syndicats(&self, user_id: UserId) -> ExtranetResult<Vec<SyndicatSummary>> {
        self.db.read(|conn| {
            let user = Self::require_user(conn, user_id)?;
            if user.is_admin() {
                Ok(syndicats::list_active(conn)?
                    .into_iter()
                    .map(|s| SyndicatSummary {
                        syndicat_id: s.syndicat_id,
                        name: s.name,
                        infos: s.infos,
                    })
                    .collect())
            } else {
                syndicats::for_user(conn, user_id)
            }
        })
    }

    fn syndicat_categories(
        &self,
        user_id: UserId,
        syndicat_id: SyndicatId,
    ) -> ExtranetResult<Vec<CategorySummary>> {
        self.db.read(|conn| {
            Self::authorize_syndicat(conn, user_id, syndicat_id)?;
            Self::active_syndicat(conn, syndicat_id)?;
            syndicats::visible_categories(conn, syndicat_id)
        })
    }

    fn list_documents(
        &self,
        user_id: UserId,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        page: usize,
    ) -> ExtranetResult<DocumentPage> {
        let page = page.max(1);
        let (syndicat, category, rows) = self.db.read(|conn| {
            let user = Self::authorize_syndicat(conn, user_id, syndicat_id)?;
            let (syndicat, category) =
                Self::resolve_location(conn, syndicat_id, category_id, !user.is_admin())?;
            let rows = files::for_category(conn, syndicat_id, category_id)?;
            Ok((syndicat, category, rows))
        })?;

        let names = self
            .documents
            .list_documents(&syndicat.name, &category.name)?
            .ok_or_else(|| ExtranetError::not_found(messages::NO_DOCUMENT))?;

        let mut rows: HashMap<String, _> =
            rows.into_iter().map(|r| (r.file_name.clone(), r)).collect();

        let files = page_slice(&names, page, PAGE_SIZE)
            .iter()
            .map(|name| match rows.remove(name) {
                Some(row) => DocumentEntry {
                    file_name: name.clone(),
                    id: Some(row.id),
                    has_expired: row.has_expired,
                    expiration_date: row.expiration_date,
                },
                None => DocumentEntry {
                    file_name: name.clone(),
                    id: None,
                    has_expired: false,
                    expiration_date: None,
                },
            })
            .collect();

        Ok(DocumentPage {
            files,
            total: names.len(),
            page,
            limit: PAGE_SIZE,
        })
    }

    fn open_document(
        &self,
        user_id: UserId,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        file_name: &str,
    ) -> ExtranetResult<DocumentContent> {
        validate_file_name(file_name)?;
        let (syndicat, category) = self.db.read(|conn| {
            let user = Self::authorize_syndicat(conn, user_id, syndicat_id)?;
            Self::resolve_location(conn, syndicat_id, category_id, !user.is_admin())
        })?;

        let bytes = self
            .documents
            .read_document(&syndicat.name, &category.name, file_name)?
            .ok_or_else(|| ExtranetError::not_found(messages::FILE_NOT_FOUND))?;

        Ok(DocumentContent {
            file_name: file_name.to_string(),
            bytes,
        })
    }

    fn archive_document(
        &self,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        file_name: &str,
    ) -> ExtranetResult<()> {
        validate_file_name(file_name)?;
        let (syndicat, category) = self
            .db
            .read(|conn| Self::resolve_location(conn, syndicat_id, category_id, false))?;
        let now = self.clock.now();

        let mut moved = false;
        let result = self.db.transaction(|tx| {
            moved = self
                .documents
                .archive_document(&syndicat.name, &category.name, file_name)?;
            if !moved {
                return Err(ExtranetError::not_found(messages::FILE_NOT_FOUND));
            }
            files::mark_expired(tx, syndicat_id, category_id, file_name, now)
        });

        match result {
            Ok(_) => {
                info!(syndicat_id, category_id, file_name, "document archived");
                Ok(())
            }
            Err(err) => {
                if moved {
                    if let Err(restore) =
                        self.documents
                            .restore_document(&syndicat.name, &category.name, file_name)
                    {
                        error!(file_name, error = %restore, "archived document could not be restored");
                    }
                }
                Err(err)
            }
        }
    }

    fn upload_documents(
        &self,
        uploader_id: UserId,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        documents: Vec<UploadedDocument>,
    ) -> ExtranetResult<usize> {
        if documents.is_empty() {
            return Err(ExtranetError::validation(messages::NO_FILE_UPLOADED));
        }
        for document in &documents {
            validate_file_name(&document.file_name)?;
        }

        let (syndicat, category) = self
            .db
            .read(|conn| Self::resolve_location(conn, syndicat_id, category_id, false))?;
        self.documents
            .create_category_dirs(&syndicat.name, &category.name)?;

        let existing: HashSet<String> = self
            .documents
            .list_documents(&syndicat.name, &category.name)?
            .unwrap_or_default()
            .into_iter()
            .collect();

        let now = self.clock.now();
        let mut touched: Vec<&str> = Vec::new();
        let mut previous: HashMap<&str, Vec<u8>> = HashMap::new();
        let result = self.db.transaction(|tx| {
            for document in &documents {
                let name = document.file_name.as_str();
                files::upsert(
                    tx,
                    uploader_id,
                    syndicat_id,
                    category_id,
                    name,
                    document.expiration_date,
                    is_past(document.expiration_date, now),
                    now,
                )?;
                if existing.contains(name) && !previous.contains_key(name) {
                    if let Some(bytes) =
                        self.documents
                            .read_document(&syndicat.name, &category.name, name)?
                    {
                        previous.insert(name, bytes);
                    }
                }
                touched.push(name);
                self.documents
                    .write_document(&syndicat.name, &category.name, name, &document.bytes)?;
            }
            Ok(documents.len())
        });

        if let Err(err) = &result {
            // Overwritten files get their old bytes back, new ones go away with the rows.
            for name in &touched {
                let undone = match previous.get(name) {
                    Some(bytes) => {
                        self.documents
                            .write_document(&syndicat.name, &category.name, name, bytes)
                    }
                    None => self
                        .documents
                        .remove_document(&syndicat.name, &category.name, name),
                };
                if let Err(undo) = undone {
                    warn!(file_name = *name, error = %undo, "document left out of sync with its row");
                }
            }
            warn!(syndicat_id, category_id, error = %err, "document upload rolled back");
        } else {
            info!(syndicat_id, category_id, count = documents.len(), "documents uploaded");
        }
        result
    }

    fn update_syndicat_infos(
        &self,
        syndicat_id: SyndicatId,
        infos: Option<String>,
    ) -> ExtranetResult<()> {
        let infos = infos.filter(|s| !s.trim().is_empty());
        let now = self.clock.now();
        self.db.transaction(|tx| {
            Self::active_syndicat(tx, syndicat_id)?;
            syndicats::set_infos(tx, syndicat_id, infos.as_deref(), now)
        })?;

        info!(syndicat_id, "syndicat infos updated");
        Ok(())
    }

    fn set_expiration_date(
        &self,
        uploader_id: UserId,
        syndicat_id: SyndicatId,
        category_id: CategoryId,
        file_name: &str,
        expiration_date: Option<DateTime<Utc>>,
    ) -> ExtranetResult<()> {
        validate_file_name(file_name)?;
        let (syndicat, category) = self
            .db
            .read(|conn| Self::resolve_location(conn, syndicat_id, category_id, false))?;

        let on_disk = self
            .documents
            .list_documents(&syndicat.name, &category.name)?
            .is_some_and(|names| names.iter().any(|n| n == file_name));
        if !on_disk {
            return Err(ExtranetError::not_found(messages::FILE_NOT_FOUND));
        }

        let now = self.clock.now();
        self.db.transaction(|tx| {
            files::upsert(
                tx,
                uploader_id,
                syndicat_id,
                category_id,
                file_name,
                expiration_date,
                is_past(expiration_date, now),
                now,
            )
        })?;

        info!(syndicat_id, category_id, file_name, "expiration date updated");
        Ok(())
    }
}
