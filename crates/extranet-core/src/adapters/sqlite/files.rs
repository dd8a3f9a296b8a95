//! `files` table: expiry metadata for documents stored on disk.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::optional_timestamp;
use crate::domain::dates::to_unix;
use crate::domain::entities::{CategoryId, ExpiredDocument, FileRecord, SyndicatId, UserId};
use crate::domain::errors::ExtranetResult;

const COLUMNS: &str =
    "id, user_id, syndicat_id, category_id, file_name, has_expired, expiration_date";

fn from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        syndicat_id: row.get("syndicat_id")?,
        category_id: row.get("category_id")?,
        file_name: row.get("file_name")?,
        has_expired: row.get("has_expired")?,
        expiration_date: optional_timestamp(row, "expiration_date")?,
    })
}

pub fn find(
    conn: &Connection,
    syndicat_id: SyndicatId,
    category_id: CategoryId,
    file_name: &str,
) -> ExtranetResult<Option<FileRecord>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM files WHERE syndicat_id = ?1 AND category_id = ?2 AND file_name = ?3"
    );
    Ok(conn
        .query_row(&sql, params![syndicat_id, category_id, file_name], from_row)
        .optional()?)
}

pub fn for_category(
    conn: &Connection,
    syndicat_id: SyndicatId,
    category_id: CategoryId,
) -> ExtranetResult<Vec<FileRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM files WHERE syndicat_id = ?1 AND category_id = ?2");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![syndicat_id, category_id], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Inserts a row, or on the (syndicat, category, name) key refreshes its
/// expiry fields. The uploader of an existing row is kept.
#[allow(clippy::too_many_arguments)]
pub fn upsert(
    conn: &Connection,
    uploader_id: UserId,
    syndicat_id: SyndicatId,
    category_id: CategoryId,
    file_name: &str,
    expiration_date: Option<DateTime<Utc>>,
    has_expired: bool,
    now: DateTime<Utc>,
) -> ExtranetResult<()> {
    conn.execute(
        "INSERT INTO files
             (user_id, syndicat_id, category_id, file_name, has_expired, expiration_date, creation_date, update_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT (syndicat_id, category_id, file_name) DO UPDATE SET
             has_expired = excluded.has_expired,
             expiration_date = excluded.expiration_date,
             update_date = excluded.update_date",
        params![
            uploader_id,
            syndicat_id,
            category_id,
            file_name,
            has_expired,
            expiration_date.map(to_unix),
            to_unix(now),
        ],
    )?;
    Ok(())
}

/// Flags one document as expired. Returns the number of rows touched
/// (0 when the document never had a row).
pub fn mark_expired(
    conn: &Connection,
    syndicat_id: SyndicatId,
    category_id: CategoryId,
    file_name: &str,
    now: DateTime<Utc>,
) -> ExtranetResult<usize> {
    Ok(conn.execute(
        "UPDATE files SET has_expired = 1, update_date = ?4
         WHERE syndicat_id = ?1 AND category_id = ?2 AND file_name = ?3",
        params![syndicat_id, category_id, file_name, to_unix(now)],
    )?)
}

/// Rows still live whose expiration date is before `now`.
pub fn due_for_expiry(conn: &Connection, now: DateTime<Utc>) -> ExtranetResult<Vec<ExpiredDocument>> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.file_name, s.name, c.name
         FROM files f
         LEFT JOIN syndicats s ON s.syndicat_id = f.syndicat_id
         LEFT JOIN categories c ON c.category_id = f.category_id
         WHERE f.has_expired = 0 AND f.expiration_date IS NOT NULL AND f.expiration_date < ?1
         ORDER BY s.name, c.name, f.file_name",
    )?;
    let rows = stmt
        .query_map(params![to_unix(now)], |r| {
            Ok(ExpiredDocument {
                file_id: r.get(0)?,
                file_name: r.get(1)?,
                syndicat_name: r.get(2)?,
                category_name: r.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Flips every row selected by [`due_for_expiry`].
pub fn flag_due(conn: &Connection, now: DateTime<Utc>) -> ExtranetResult<usize> {
    Ok(conn.execute(
        "UPDATE files SET has_expired = 1, update_date = ?1
         WHERE has_expired = 0 AND expiration_date IS NOT NULL AND expiration_date < ?1",
        params![to_unix(now)],
    )?)
}
