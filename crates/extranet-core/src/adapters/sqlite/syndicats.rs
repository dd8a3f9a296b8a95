//! `syndicats` and `syndicats_categories` tables.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::dates::to_unix;
use crate::domain::entities::{
    CategoryId, CategorySummary, NamedRef, Syndicat, SyndicatId, SyndicatSummary, UserId,
};
use crate::domain::errors::{ExtranetError, ExtranetResult};

pub(crate) const NAME_TAKEN: &str = "Un syndicat porte déjà ce nom.";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Syndicat> {
    Ok(Syndicat {
        syndicat_id: row.get("syndicat_id")?,
        name: row.get("name")?,
        infos: row.get("infos")?,
        is_deleted: row.get("is_deleted")?,
    })
}

pub fn find_by_id(conn: &Connection, syndicat_id: SyndicatId) -> ExtranetResult<Option<Syndicat>> {
    Ok(conn
        .query_row(
            "SELECT syndicat_id, name, infos, is_deleted FROM syndicats WHERE syndicat_id = ?1",
            params![syndicat_id],
            from_row,
        )
        .optional()?)
}

pub fn find_by_name(conn: &Connection, name: &str) -> ExtranetResult<Option<Syndicat>> {
    Ok(conn
        .query_row(
            "SELECT syndicat_id, name, infos, is_deleted FROM syndicats WHERE name = ?1",
            params![name],
            from_row,
        )
        .optional()?)
}

/// Active syndicats by name.
pub fn list_active(conn: &Connection) -> ExtranetResult<Vec<Syndicat>> {
    let mut stmt = conn.prepare(
        "SELECT syndicat_id, name, infos, is_deleted FROM syndicats
         WHERE is_deleted = 0 ORDER BY name",
    )?;
    let rows = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn insert(conn: &Connection, name: &str, now: DateTime<Utc>) -> ExtranetResult<SyndicatId> {
    conn.execute(
        "INSERT INTO syndicats (name, creation_date, update_date) VALUES (?1, ?2, ?2)",
        params![name, to_unix(now)],
    )
    .map_err(|e| ExtranetError::from_constraint(e, NAME_TAKEN))?;
    Ok(conn.last_insert_rowid())
}

pub fn reactivate(conn: &Connection, syndicat_id: SyndicatId, now: DateTime<Utc>) -> ExtranetResult<()> {
    conn.execute(
        "UPDATE syndicats SET is_deleted = 0, update_date = ?2 WHERE syndicat_id = ?1",
        params![syndicat_id, to_unix(now)],
    )?;
    Ok(())
}

pub fn mark_deleted(conn: &Connection, syndicat_id: SyndicatId, now: DateTime<Utc>) -> ExtranetResult<bool> {
    let changed = conn.execute(
        "UPDATE syndicats SET is_deleted = 1, update_date = ?2 WHERE syndicat_id = ?1",
        params![syndicat_id, to_unix(now)],
    )?;
    Ok(changed > 0)
}

pub fn set_infos(
    conn: &Connection,
    syndicat_id: SyndicatId,
    infos: Option<&str>,
    now: DateTime<Utc>,
) -> ExtranetResult<bool> {
    let changed = conn.execute(
        "UPDATE syndicats SET infos = ?2, update_date = ?3 WHERE syndicat_id = ?1",
        params![syndicat_id, infos, to_unix(now)],
    )?;
    Ok(changed > 0)
}

/// Active syndicats a user belongs to, by name.
pub fn for_user(conn: &Connection, user_id: UserId) -> ExtranetResult<Vec<SyndicatSummary>> {
    let mut stmt = conn.prepare(
        "SELECT s.syndicat_id, s.name, s.infos
         FROM users_syndicats us
         JOIN syndicats s ON s.syndicat_id = us.syndicat_id
         WHERE us.user_id = ?1 AND s.is_deleted = 0
         ORDER BY s.name",
    )?;
    let rows = stmt
        .query_map(params![user_id], |r| {
            Ok(SyndicatSummary {
                syndicat_id: r.get(0)?,
                name: r.get(1)?,
                infos: r.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn is_member(conn: &Connection, user_id: UserId, syndicat_id: SyndicatId) -> ExtranetResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users_syndicats WHERE user_id = ?1 AND syndicat_id = ?2",
            params![user_id, syndicat_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Links categories, un-hiding links that already exist.
pub fn link_categories(
    conn: &Connection,
    syndicat_id: SyndicatId,
    category_ids: &[CategoryId],
) -> ExtranetResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO syndicats_categories (syndicat_id, category_id) VALUES (?1, ?2)
         ON CONFLICT (syndicat_id, category_id) DO UPDATE SET is_hidden = 0",
    )?;
    for category_id in category_ids {
        stmt.execute(params![syndicat_id, category_id])?;
    }
    Ok(())
}

pub fn clear_categories(conn: &Connection, syndicat_id: SyndicatId) -> ExtranetResult<()> {
    conn.execute(
        "DELETE FROM syndicats_categories WHERE syndicat_id = ?1",
        params![syndicat_id],
    )?;
    Ok(())
}

/// Visible, active categories of one syndicat, by name.
pub fn visible_categories(
    conn: &Connection,
    syndicat_id: SyndicatId,
) -> ExtranetResult<Vec<CategorySummary>> {
    let mut stmt = conn.prepare(
        "SELECT c.category_id, c.name
         FROM syndicats_categories sc
         JOIN categories c ON c.category_id = sc.category_id
         WHERE sc.syndicat_id = ?1 AND sc.is_hidden = 0 AND c.is_deleted = 0
         ORDER BY c.name",
    )?;
    let rows = stmt
        .query_map(params![syndicat_id], |r| {
            Ok(CategorySummary {
                category_id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Whether a category is published (visible and active) for a syndicat.
pub fn has_visible_category(
    conn: &Connection,
    syndicat_id: SyndicatId,
    category_id: CategoryId,
) -> ExtranetResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM syndicats_categories sc
             JOIN categories c ON c.category_id = sc.category_id
             WHERE sc.syndicat_id = ?1 AND sc.category_id = ?2
               AND sc.is_hidden = 0 AND c.is_deleted = 0",
            params![syndicat_id, category_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// `(syndicat, category)` pairs over visible links, ordered by category name.
pub fn visible_links(conn: &Connection) -> ExtranetResult<Vec<(SyndicatId, NamedRef)>> {
    let mut stmt = conn.prepare(
        "SELECT sc.syndicat_id, c.category_id, c.name
         FROM syndicats_categories sc
         JOIN categories c ON c.category_id = sc.category_id
         WHERE sc.is_hidden = 0 AND c.is_deleted = 0
         ORDER BY c.name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get(0)?,
                NamedRef {
                    id: r.get(1)?,
                    name: r.get(2)?,
                },
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{categories, Database};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_duplicate_name_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        let result = db.transaction(|tx| {
            insert(tx, "Le Parc", now())?;
            insert(tx, "Le Parc", now())
        });
        assert!(matches!(result, Err(ExtranetError::Conflict(_))));
    }

    #[test]
    fn test_link_categories_unhides_existing_links() {
        let db = Database::open_in_memory().unwrap();
        let (s, c) = db
            .transaction(|tx| {
                let s = insert(tx, "Le Parc", now())?;
                let c = categories::insert(tx, "PV", now())?;
                link_categories(tx, s, &[c])?;
                Ok((s, c))
            })
            .unwrap();

        db.read(|conn| categories::mark_deleted(conn, c)).unwrap();
        assert!(!db.read(|conn| has_visible_category(conn, s, c)).unwrap());

        db.read(|conn| categories::reactivate(conn, c)).unwrap();
        assert!(db.read(|conn| has_visible_category(conn, s, c)).unwrap());

        db.read(|conn| link_categories(conn, s, &[c, c])).unwrap();
        assert_eq!(db.read(|conn| visible_categories(conn, s)).unwrap().len(), 1);
    }

    #[test]
    fn test_for_user_skips_deleted_syndicats() {
        let db = Database::open_in_memory().unwrap();
        db.read(|conn| {
            conn.execute(
                "INSERT INTO users (email, password, surname, first_name, creation_date, update_date)
                 VALUES ('a@x.fr', 'h', 'D', 'A', 0, 0)",
                [],
            )?;
            let a = insert(conn, "B-Syndicat", now())?;
            let b = insert(conn, "A-Syndicat", now())?;
            let c = insert(conn, "Gone", now())?;
            for s in [a, b, c] {
                crate::adapters::sqlite::users::link_syndicat(conn, 1, s)?;
            }
            mark_deleted(conn, c, now())?;
            Ok(())
        })
        .unwrap();

        let names: Vec<String> = db
            .read(|conn| for_user(conn, 1))
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["A-Syndicat", "B-Syndicat"]);
        assert!(db.read(|conn| is_member(conn, 1, 3)).unwrap());
        assert!(!db.read(|conn| is_member(conn, 1, 42)).unwrap());
    }
}
