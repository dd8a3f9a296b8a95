//! `users` and `users_syndicats` tables.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{optional_timestamp, timestamp};
use crate::domain::dates::to_unix;
use crate::domain::entities::{NamedRef, NewUser, SyndicatId, User, UserId, UserUpdate};
use crate::domain::errors::{ExtranetError, ExtranetResult};

const COLUMNS: &str = "user_id, email, password, first_login, civilite, surname, first_name, \
                       role, login_counter, last_logged_in, creation_date, update_date";

pub(crate) const EMAIL_TAKEN: &str = "Cette adresse mail est déjà utilisée.";

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get("user_id")?,
        email: row.get("email")?,
        password_hash: row.get("password")?,
        first_login: row.get("first_login")?,
        civilite: row.get("civilite")?,
        surname: row.get("surname")?,
        first_name: row.get("first_name")?,
        role: row.get("role")?,
        login_counter: row.get("login_counter")?,
        last_logged_in: optional_timestamp(row, "last_logged_in")?,
        creation_date: timestamp(row, "creation_date")?,
        update_date: timestamp(row, "update_date")?,
    })
}

pub fn find_by_email(conn: &Connection, email: &str) -> ExtranetResult<Option<User>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE email = ?1");
    Ok(conn
        .query_row(&sql, params![email.trim()], from_row)
        .optional()?)
}

pub fn find_by_id(conn: &Connection, user_id: UserId) -> ExtranetResult<Option<User>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE user_id = ?1");
    Ok(conn.query_row(&sql, params![user_id], from_row).optional()?)
}

/// Every user, oldest first.
pub fn list_all(conn: &Connection) -> ExtranetResult<Vec<User>> {
    let sql = format!("SELECT {COLUMNS} FROM users ORDER BY user_id");
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

/// The subset of `emails` already registered, as stored.
pub fn existing_emails(conn: &Connection, emails: &[String]) -> ExtranetResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT email FROM users WHERE email = ?1")?;
    let mut found = Vec::new();
    for email in emails {
        if let Some(stored) = stmt
            .query_row(params![email.trim()], |r| r.get::<_, String>(0))
            .optional()?
        {
            found.push(stored);
        }
    }
    Ok(found)
}

pub fn admin_emails(conn: &Connection) -> ExtranetResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT email FROM users WHERE role = 'admin' ORDER BY user_id")?;
    let emails = stmt
        .query_map([], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(emails)
}

pub fn insert(conn: &Connection, user: &NewUser, now: DateTime<Utc>) -> ExtranetResult<UserId> {
    conn.execute(
        "INSERT INTO users (email, password, civilite, surname, first_name, role, creation_date, update_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            user.email.trim(),
            user.password_hash,
            user.civilite,
            user.surname,
            user.first_name,
            user.role,
            to_unix(now),
        ],
    )
    .map_err(|e| ExtranetError::from_constraint(e, EMAIL_TAKEN))?;
    Ok(conn.last_insert_rowid())
}

pub fn record_login(conn: &Connection, user_id: UserId, now: DateTime<Utc>) -> ExtranetResult<()> {
    conn.execute(
        "UPDATE users SET login_counter = login_counter + 1, last_logged_in = ?2 WHERE user_id = ?1",
        params![user_id, to_unix(now)],
    )?;
    Ok(())
}

/// Stores a new hash and clears the first-login flag.
pub fn set_password(
    conn: &Connection,
    user_id: UserId,
    password_hash: &str,
    now: DateTime<Utc>,
) -> ExtranetResult<bool> {
    let changed = conn.execute(
        "UPDATE users SET password = ?2, first_login = 0, update_date = ?3 WHERE user_id = ?1",
        params![user_id, password_hash, to_unix(now)],
    )?;
    Ok(changed > 0)
}

pub fn update(conn: &Connection, update: &UserUpdate, now: DateTime<Utc>) -> ExtranetResult<bool> {
    let changed = conn
        .execute(
            "UPDATE users
             SET civilite = ?2, first_name = ?3, surname = ?4, email = ?5, role = ?6, update_date = ?7
             WHERE user_id = ?1",
            params![
                update.user_id,
                update.civilite,
                update.first_name,
                update.surname,
                update.email.trim(),
                update.role,
                to_unix(now),
            ],
        )
        .map_err(|e| ExtranetError::from_constraint(e, EMAIL_TAKEN))?;
    Ok(changed > 0)
}

/// Removes the account; its links cascade and its uploads lose their author.
pub fn delete(conn: &Connection, user_id: UserId) -> ExtranetResult<bool> {
    conn.execute(
        "DELETE FROM users_syndicats WHERE user_id = ?1",
        params![user_id],
    )?;
    let changed = conn.execute("DELETE FROM users WHERE user_id = ?1", params![user_id])?;
    Ok(changed > 0)
}

pub fn link_syndicat(
    conn: &Connection,
    user_id: UserId,
    syndicat_id: SyndicatId,
) -> ExtranetResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users_syndicats (user_id, syndicat_id) VALUES (?1, ?2)",
        params![user_id, syndicat_id],
    )?;
    Ok(())
}

pub fn replace_syndicats(
    conn: &Connection,
    user_id: UserId,
    syndicat_ids: &[SyndicatId],
) -> ExtranetResult<()> {
    conn.execute(
        "DELETE FROM users_syndicats WHERE user_id = ?1",
        params![user_id],
    )?;
    for syndicat_id in syndicat_ids {
        link_syndicat(conn, user_id, *syndicat_id)?;
    }
    Ok(())
}

/// `(user, syndicat)` pairs over active syndicats, ordered by syndicat name.
pub fn syndicat_links(conn: &Connection) -> ExtranetResult<Vec<(UserId, NamedRef)>> {
    let mut stmt = conn.prepare(
        "SELECT us.user_id, s.syndicat_id, s.name
         FROM users_syndicats us
         JOIN syndicats s ON s.syndicat_id = us.syndicat_id
         WHERE s.is_deleted = 0
         ORDER BY s.name",
    )?;
    let links = stmt
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
    Ok(links)
}
