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

use chrono::Utc;
use rusqlite::{params, params_from_iter, types::ToSql, Row};
use serde::{Deserialize, Serialize};
use warp::{
    http::StatusCode,
    reply::{json, Json},
    Filter, Rejection, Reply,
};

use crate::{db, guard, util, util::DateFilter, Error};

pub const ITEM_TYPES: [&str; 4] = ["word", "sentence", "grammar", "letter"];

pub fn api(db: db::Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_items = warp::get()
        .and(warp::path("items"))
        .and(warp::path::end())
        .and(warp::query())
        .and(guard::with_db(db.clone()))
        .and_then(list_items);

    let create_item = warp::post()
        .and(warp::path("items"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_db(db.clone()))
        .and_then(create_item);

    let delete_item = warp::delete()
        .and(warp::path("items"))
        .and(warp::path("delete"))
        .and(warp::path::end())
        .and(warp::query())
        .and(guard::with_db(db))
        .and_then(delete_item);

    list_items.or(create_item).or(delete_item)
}

/// A single vocabulary/sentence/grammar/letter entry logged by a user for
/// one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningItem {
    pub id: i64,
    pub user_id: i64,
    pub language_id: i64,
    #[serde(rename = "type")]
    pub item_type: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
}

impl LearningItem {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(LearningItem {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            language_id: row.get("language_id")?,
            item_type: row.get("type")?,
            content: row.get("content")?,
            translation: row.get("translation")?,
            meaning: row.get("meaning")?,
            pronunciation: row.get("pronunciation")?,
            audio_data: row.get("audio_data")?,
            example_usage: row.get("example_usage")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Query parameters shared by the item and flashcard listings.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub user_id: Option<i64>,
    pub language_id: Option<i64>,
    pub date_filter: Option<String>,
}

impl ListQuery {
    /// Required `user_id`, parsed `date_filter`; 400 when either is off.
    pub(crate) fn checked(&self) -> Result<(i64, DateFilter), Error> {
        let user_id = self
            .user_id
            .ok_or_else(|| Error::BadRequest("user_id required".to_string()))?;
        let filter = self
            .date_filter
            .as_deref()
            .unwrap_or("all")
            .parse::<DateFilter>()
            .map_err(Error::BadRequest)?;
        Ok((user_id, filter))
    }
}

async fn list_items(query: ListQuery, db: db::Db) -> Result<Json, Rejection> {
    let (user_id, filter) = query.checked()?;

    let mut sql = String::from(
        "SELECT id, user_id, language_id, type, content, translation, meaning,
                pronunciation, audio_data, example_usage, notes, created_at
         FROM learning_items WHERE user_id = ?",
    );
    let mut args: Vec<Box<dyn ToSql + Send>> = vec![Box::new(user_id)];

    if let Some(language_id) = query.language_id {
        sql.push_str(" AND language_id = ?");
        args.push(Box::new(language_id));
    }
    if let Some(threshold) = filter.threshold(Utc::now()) {
        sql.push_str(" AND created_at >= ?");
        args.push(Box::new(util::timestamp(threshold)));
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");

    let conn = db.lock().await;
    let items = {
        let mut stmt = conn.prepare(&sql).map_err(Error::from)?;
        let rows = stmt
            .query_map(
                params_from_iter(args.iter().map(|a| a.as_ref() as &dyn ToSql)),
                LearningItem::from_row,
            )
            .map_err(Error::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        rows
    };

    Ok(json(&items))
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateItemReq {
    pub user_id: i64,
    pub language_id: i64,
    #[serde(rename = "type")]
    pub item_type: String,
    pub content: String,
    pub translation: Option<String>,
    pub meaning: Option<String>,
    pub pronunciation: Option<String>,
    pub audio_data: Option<String>,
    pub example_usage: Option<String>,
    pub notes: Option<String>,
}

async fn create_item(req: CreateItemReq, db: db::Db) -> Result<Json, Rejection> {
    if req.user_id == 0 || req.language_id == 0 || req.item_type.is_empty() || req.content.is_empty()
    {
        return Err(Error::BadRequest(
            "user_id, language_id, type, and content are required".to_string(),
        )
        .into());
    }
    if !ITEM_TYPES.contains(&req.item_type.as_str()) {
        return Err(Error::BadRequest(
            "type must be one of word, sentence, grammar, letter".to_string(),
        )
        .into());
    }

    let conn = db.lock().await;
    db::require_user(&conn, req.user_id)?;
    db::require_language(&conn, req.language_id)?;

    let created_at = util::now();
    conn.execute(
        "INSERT INTO learning_items
         (user_id, language_id, type, content, translation, meaning, pronunciation,
          audio_data, example_usage, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            req.user_id,
            req.language_id,
            req.item_type,
            req.content,
            req.translation,
            req.meaning,
            req.pronunciation,
            req.audio_data,
            req.example_usage,
            req.notes,
            created_at,
        ],
    )
    .map_err(Error::from)?;

    Ok(json(&LearningItem {
        id: conn.last_insert_rowid(),
        user_id: req.user_id,
        language_id: req.language_id,
        item_type: req.item_type,
        content: req.content,
        translation: req.translation,
        meaning: req.meaning,
        pronunciation: req.pronunciation,
        audio_data: req.audio_data,
        example_usage: req.example_usage,
        notes: req.notes,
        created_at,
    }))
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteQuery {
    pub id: Option<i64>,
}

async fn delete_item(query: DeleteQuery, db: db::Db) -> Result<StatusCode, Rejection> {
    let id = query
        .id
        .ok_or_else(|| Error::BadRequest("id parameter required".to_string()))?;

    let conn = db.lock().await;
    // Review history references the item; drop it first to satisfy the
    // foreign key.
    conn.execute("DELETE FROM flashcard_sessions WHERE item_id = ?1", [id])
        .map_err(Error::from)?;
    conn.execute("DELETE FROM learning_items WHERE id = ?1", [id])
        .map_err(Error::from)?;

    Ok(StatusCode::OK)
}
