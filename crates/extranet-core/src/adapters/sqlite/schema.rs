//! Versioned schema migrations keyed on `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::info;

/// Each entry moves the schema one version forward. Never edit a shipped
/// entry; append a new one.
const MIGRATIONS: &[&str] = &[
    // 1: accounts, syndicats, categories and their links
    r#"
    CREATE TABLE users (
        user_id        INTEGER PRIMARY KEY AUTOINCREMENT,
        email          TEXT    NOT NULL UNIQUE COLLATE NOCASE,
        password       TEXT    NOT NULL,
        first_login    INTEGER NOT NULL DEFAULT 1,
        civilite       TEXT    CHECK (civilite IN ('Mr', 'Mme')),
        surname        TEXT    NOT NULL,
        first_name     TEXT    NOT NULL,
        role           TEXT    NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
        login_counter  INTEGER NOT NULL DEFAULT 0,
        last_logged_in INTEGER,
        creation_date  INTEGER NOT NULL,
        update_date    INTEGER NOT NULL
    );

    CREATE TABLE syndicats (
        syndicat_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT    NOT NULL UNIQUE,
        infos         TEXT,
        is_deleted    INTEGER NOT NULL DEFAULT 0,
        creation_date INTEGER NOT NULL,
        update_date   INTEGER NOT NULL
    );

    CREATE TABLE categories (
        category_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT    NOT NULL UNIQUE,
        is_deleted    INTEGER NOT NULL DEFAULT 0,
        creation_date INTEGER NOT NULL
    );

    CREATE TABLE users_syndicats (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id     INTEGER NOT NULL REFERENCES users (user_id) ON DELETE CASCADE,
        syndicat_id INTEGER NOT NULL REFERENCES syndicats (syndicat_id) ON DELETE CASCADE,
        UNIQUE (user_id, syndicat_id)
    );

    CREATE TABLE syndicats_categories (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        syndicat_id INTEGER NOT NULL REFERENCES syndicats (syndicat_id) ON DELETE CASCADE,
        category_id INTEGER NOT NULL REFERENCES categories (category_id) ON DELETE CASCADE,
        is_hidden   INTEGER NOT NULL DEFAULT 0,
        UNIQUE (syndicat_id, category_id)
    );
    "#,
    // 2: document rows
    r#"
    CREATE TABLE files (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id         INTEGER REFERENCES users (user_id) ON DELETE SET NULL,
        syndicat_id     INTEGER NOT NULL REFERENCES syndicats (syndicat_id) ON DELETE CASCADE,
        category_id     INTEGER NOT NULL REFERENCES categories (category_id) ON DELETE CASCADE,
        file_name       TEXT    NOT NULL,
        has_expired     INTEGER NOT NULL DEFAULT 0,
        expiration_date INTEGER,
        creation_date   INTEGER NOT NULL,
        update_date     INTEGER NOT NULL,
        UNIQUE (syndicat_id, category_id, file_name)
    );

    CREATE INDEX files_pending_expiry ON files (has_expired, expiration_date);
    "#,
];

/// Version reached once every migration has run.
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

pub(super) fn user_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

pub(super) fn migrate(conn: &mut Connection) -> rusqlite::Result<()> {
    let current = user_version(conn)?;

    for (index, sql) in MIGRATIONS.iter().enumerate() {
        let version = index as i64 + 1;
        if version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!(version, "applied schema migration");
    }

    Ok(())
}
