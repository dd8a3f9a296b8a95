//! `categories` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::dates::to_unix;
use crate::domain::entities::{Category, CategoryId, CategorySummary};
use crate::domain::errors::{ExtranetError, ExtranetResult};

pub(crate) const NAME_TAKEN: &str = "Une catégorie porte déjà ce nom.";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        category_id: row.get("category_id")?,
        name: row.get("name")?,
        is_deleted: row.get("is_deleted")?,
    })
}

pub fn find_by_id(conn: &Connection, category_id: CategoryId) -> ExtranetResult<Option<Category>> {
    Ok(conn
        .query_row(
            "SELECT category_id, name, is_deleted FROM categories WHERE category_id = ?1",
            params![category_id],
            from_row,
        )
        .optional()?)
}

pub fn find_by_name(conn: &Connection, name: &str) -> ExtranetResult<Option<Category>> {
    Ok(conn
        .query_row(
            "SELECT category_id, name, is_deleted FROM categories WHERE name = ?1",
            params![name],
            from_row,
        )
        .optional()?)
}

/// Active categories by name.
pub fn list_active(conn: &Connection) -> ExtranetResult<Vec<CategorySummary>> {
    let mut stmt = conn.prepare(
        "SELECT category_id, name FROM categories WHERE is_deleted = 0 ORDER BY name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(CategorySummary {
                category_id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn insert(conn: &Connection, name: &str, now: DateTime<Utc>) -> ExtranetResult<CategoryId> {
    conn.execute(
        "INSERT INTO categories (name, creation_date) VALUES (?1, ?2)",
        params![name, to_unix(now)],
    )
    .map_err(|e| ExtranetError::from_constraint(e, NAME_TAKEN))?;
    Ok(conn.last_insert_rowid())
}

/// Clears the deleted flag and shows the category again wherever it was linked.
pub fn reactivate(conn: &Connection, category_id: CategoryId) -> ExtranetResult<()> {
    conn.execute(
        "UPDATE categories SET is_deleted = 0 WHERE category_id = ?1",
        params![category_id],
    )?;
    conn.execute(
        "UPDATE syndicats_categories SET is_hidden = 0 WHERE category_id = ?1",
        params![category_id],
    )?;
    Ok(())
}

/// Soft-deletes the category and hides it from every syndicat.
pub fn mark_deleted(conn: &Connection, category_id: CategoryId) -> ExtranetResult<bool> {
    conn.execute(
        "UPDATE syndicats_categories SET is_hidden = 1 WHERE category_id = ?1",
        params![category_id],
    )?;
    let changed = conn.execute(
        "UPDATE categories SET is_deleted = 1 WHERE category_id = ?1",
        params![category_id],
    )?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::Database;
    use chrono::TimeZone;

    #[test]
    fn test_list_active_is_sorted_and_skips_deleted() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        db.transaction(|tx| {
            insert(tx, "Travaux", now)?;
            let gone = insert(tx, "Budget", now)?;
            insert(tx, "Assemblées", now)?;
            mark_deleted(tx, gone)?;
            Ok(())
        })
        .unwrap();

        let names: Vec<String> = db
            .read(list_active)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Assemblées", "Travaux"]);

        let budget = db.read(|c| find_by_name(c, "Budget")).unwrap().unwrap();
        assert!(budget.is_deleted);
    }
}
