//! Local directory tree for document bytes and imported account sheets.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::errors::ExtranetResult;
use crate::domain::naming::ARCHIVE_DIR;
use crate::ports::outbound::DocumentStore;

/// [`DocumentStore`] over two local directories.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    documents_root: PathBuf,
    accounts_dir: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(documents_root: impl Into<PathBuf>, accounts_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents_root: documents_root.into(),
            accounts_dir: accounts_dir.into(),
        }
    }

    pub fn documents_root(&self) -> &Path {
        &self.documents_root
    }

    fn category_dir(&self, syndicat: &str, category: &str) -> PathBuf {
        self.documents_root.join(syndicat).join(category)
    }

    fn live_path(&self, syndicat: &str, category: &str, file_name: &str) -> PathBuf {
        self.category_dir(syndicat, category).join(file_name)
    }

    fn archive_path(&self, syndicat: &str, category: &str, file_name: &str) -> PathBuf {
        self.category_dir(syndicat, category)
            .join(ARCHIVE_DIR)
            .join(file_name)
    }
}

impl DocumentStore for LocalDocumentStore {
    fn create_category_dirs(&self, syndicat: &str, category: &str) -> ExtranetResult<()> {
        fs::create_dir_all(self.category_dir(syndicat, category).join(ARCHIVE_DIR))?;
        Ok(())
    }

    fn list_documents(
        &self,
        syndicat: &str,
        category: &str,
    ) -> ExtranetResult<Option<Vec<String>>> {
        let dir = self.category_dir(syndicat, category);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => debug!(name = ?raw, "skipping non UTF-8 file name"),
            }
        }
        names.sort();
        Ok(Some(names))
    }

    fn read_document(
        &self,
        syndicat: &str,
        category: &str,
        file_name: &str,
    ) -> ExtranetResult<Option<Vec<u8>>> {
        let path = self.live_path(syndicat, category, file_name);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(fs::read(&path)?)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(
        &self,
        syndicat: &str,
        category: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> ExtranetResult<()> {
        fs::create_dir_all(self.category_dir(syndicat, category))?;
        fs::write(self.live_path(syndicat, category, file_name), bytes)?;
        Ok(())
    }

    fn remove_document(
        &self,
        syndicat: &str,
        category: &str,
        file_name: &str,
    ) -> ExtranetResult<()> {
        match fs::remove_file(self.live_path(syndicat, category, file_name)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn archive_document(
        &self,
        syndicat: &str,
        category: &str,
        file_name: &str,
    ) -> ExtranetResult<bool> {
        let from = self.live_path(syndicat, category, file_name);
        if !from.is_file() {
            return Ok(false);
        }
        let to = self.archive_path(syndicat, category, file_name);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&from, &to)?;
        Ok(true)
    }

    fn restore_document(
        &self,
        syndicat: &str,
        category: &str,
        file_name: &str,
    ) -> ExtranetResult<()> {
        fs::rename(
            self.archive_path(syndicat, category, file_name),
            self.live_path(syndicat, category, file_name),
        )?;
        Ok(())
    }

    fn store_account_sheet(&self, sheet_name: &str, bytes: &[u8]) -> ExtranetResult<()> {
        fs::create_dir_all(&self.accounts_dir)?;
        fs::write(self.accounts_dir.join(sheet_name), bytes)?;
        Ok(())
    }
}
