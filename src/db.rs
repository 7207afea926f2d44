/*
 * Copyright (C) 2025 Language Learner Developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use std::{fs, path::Path, sync::Arc};

use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::info;

use crate::Error;

/// Shared handle to the embedded database. One connection guarded by an
/// async mutex; each handler locks it for the duration of its statements.
pub type Db = Arc<Mutex<Connection>>;

/// Opens (or creates) the single-file database at `path`, applies the
/// schema, and migrates legacy tables in place.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Db, Error> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let conn = Connection::open(path)?;
    init(&conn)?;
    info!(path = %path.display(), "database initialized");
    Ok(Arc::new(Mutex::new(conn)))
}

/// An in-memory database with the full schema applied. State lives only as
/// long as the handle; used by tests and as a last-resort fallback.
pub fn open_in_memory() -> Result<Db, Error> {
    let conn = Connection::open_in_memory()?;
    init(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn init(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(include_str!("schema.sql"))?;
    migrate(conn)?;
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Additive, in-place migration for databases created before the current
/// schema: detects missing columns and issues one `ALTER TABLE` per column.
fn migrate(conn: &Connection) -> Result<(), Error> {
    let user_columns = table_columns(conn, "users")?;
    if !user_columns.iter().any(|c| c == "password_hash") {
        info!("migrating users table: adding authentication columns");
        // SQLite only accepts one added column per ALTER statement.
        conn.execute_batch(
            "ALTER TABLE users ADD COLUMN password_hash TEXT;
             ALTER TABLE users ADD COLUMN forgot_question TEXT;
             ALTER TABLE users ADD COLUMN forgot_answer_hash TEXT;",
        )?;
        purge_users_without_credentials(conn)?;
    }

    let item_columns = table_columns(conn, "learning_items")?;
    if !item_columns.iter().any(|c| c == "audio_data") {
        info!("migrating learning_items table: adding audio_data column");
        conn.execute("ALTER TABLE learning_items ADD COLUMN audio_data TEXT", [])?;
    }

    Ok(())
}

/// Users predating the authentication columns cannot log in under the new
/// scheme; they and their dependent rows are removed, children first.
fn purge_users_without_credentials(conn: &Connection) -> Result<(), Error> {
    let mut stmt =
        conn.prepare("SELECT id FROM users WHERE password_hash IS NULL OR password_hash = ''")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Ok(());
    }
    info!(count = ids.len(), "removing legacy users without credentials");
    for id in ids {
        conn.execute("DELETE FROM flashcard_sessions WHERE user_id = ?1", [id])?;
        conn.execute("DELETE FROM learning_items WHERE user_id = ?1", [id])?;
        conn.execute("DELETE FROM languages WHERE user_id = ?1", [id])?;
        conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
    }
    Ok(())
}

/// Signup-first invariant: rows keyed by a user id may only be written for
/// users that actually exist. The foreign keys backstop this; checking
/// explicitly turns the violation into a clean 404.
pub fn require_user(conn: &Connection, user_id: i64) -> Result<(), Error> {
    require_row(conn, "SELECT id FROM users WHERE id = ?1", user_id, "User")
}

/// Writes that reference a language must point at a real row; a stale id
/// becomes a 404 instead of a raw constraint failure.
pub fn require_language(conn: &Connection, language_id: i64) -> Result<(), Error> {
    require_row(
        conn,
        "SELECT id FROM languages WHERE id = ?1",
        language_id,
        "Language",
    )
}

/// Same check for learning items, e.g. recording a review against an item
/// that was deleted from another client in the meantime.
pub fn require_item(conn: &Connection, item_id: i64) -> Result<(), Error> {
    require_row(
        conn,
        "SELECT id FROM learning_items WHERE id = ?1",
        item_id,
        "Item",
    )
}

fn require_row(conn: &Connection, sql: &str, id: i64, what: &'static str) -> Result<(), Error> {
    conn.query_row(sql, [id], |row| row.get::<_, i64>(0))
        .optional()?
        .map(|_| ())
        .ok_or(Error::NotFound(what))
}
