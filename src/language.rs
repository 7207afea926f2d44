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

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use warp::{
    reply::{json, Json},
    Filter, Rejection, Reply,
};

use crate::{db, guard, util, Error};

pub fn api(db: db::Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_languages = warp::get()
        .and(warp::path("languages"))
        .and(warp::path::end())
        .and(warp::query())
        .and(guard::with_db(db.clone()))
        .and_then(list_languages);

    let create_language = warp::post()
        .and(warp::path("languages"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_db(db))
        .and_then(create_language);

    list_languages.or(create_language)
}

/// A language a user is studying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: i64,
    pub user_id: i64,
    pub language_code: String,
    pub language_name: String,
    pub created_at: String,
}

impl Language {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Language {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            language_code: row.get("language_code")?,
            language_name: row.get("language_name")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageQuery {
    pub user_id: Option<i64>,
}

async fn list_languages(query: LanguageQuery, db: db::Db) -> Result<Json, Rejection> {
    let user_id = query
        .user_id
        .ok_or_else(|| Error::BadRequest("user_id required".to_string()))?;

    let conn = db.lock().await;
    let languages = {
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, language_code, language_name, created_at
                 FROM languages WHERE user_id = ?1",
            )
            .map_err(Error::from)?;
        let rows = stmt
            .query_map([user_id], Language::from_row)
            .map_err(Error::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        rows
    };

    Ok(json(&languages))
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateLanguageReq {
    pub user_id: i64,
    pub language_code: String,
    pub language_name: String,
}

async fn create_language(req: CreateLanguageReq, db: db::Db) -> Result<Json, Rejection> {
    if req.user_id == 0 || req.language_code.is_empty() || req.language_name.is_empty() {
        return Err(Error::BadRequest(
            "user_id, language_code, and language_name are required".to_string(),
        )
        .into());
    }

    let conn = db.lock().await;
    db::require_user(&conn, req.user_id)?;

    // Pre-check for a friendlier message; the UNIQUE constraint backstops
    // anything that slips through and is also mapped to 409.
    let duplicate = conn
        .query_row(
            "SELECT id FROM languages WHERE user_id = ?1 AND language_code = ?2",
            params![req.user_id, req.language_code],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map_err(Error::from)?;
    if duplicate.is_some() {
        return Err(Error::Conflict(format!(
            "Language with code \"{}\" already exists for this user",
            req.language_code
        ))
        .into());
    }

    let created_at = util::now();
    conn.execute(
        "INSERT INTO languages (user_id, language_code, language_name, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![req.user_id, req.language_code, req.language_name, created_at],
    )
    .map_err(Error::from)?;

    Ok(json(&Language {
        id: conn.last_insert_rowid(),
        user_id: req.user_id,
        language_code: req.language_code,
        language_name: req.language_name,
        created_at,
    }))
}
