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
    reply::{json, Json},
    Filter, Rejection, Reply,
};

use crate::{
    db, guard,
    item::{LearningItem, ListQuery},
    util, Error,
};

pub fn api(db: db::Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_flashcards = warp::get()
        .and(warp::path("flashcards"))
        .and(warp::path::end())
        .and(warp::query())
        .and(guard::with_db(db.clone()))
        .and_then(list_flashcards);

    let record_session = warp::post()
        .and(warp::path("flashcards"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_db(db))
        .and_then(record_session);

    list_flashcards.or(record_session)
}

/// A learning item together with review statistics derived from its
/// session log. The statistics are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardItem {
    #[serde(flatten)]
    pub item: LearningItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<String>,
    pub review_count: i64,
    pub correct_count: i64,
}

impl FlashcardItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(FlashcardItem {
            item: LearningItem::from_row(row)?,
            last_reviewed: row.get("last_reviewed")?,
            review_count: row.get("review_count")?,
            correct_count: row.get("correct_count")?,
        })
    }
}

async fn list_flashcards(query: ListQuery, db: db::Db) -> Result<Json, Rejection> {
    let (user_id, filter) = query.checked()?;

    let mut sql = String::from(
        "SELECT li.id, li.user_id, li.language_id, li.type, li.content, li.translation,
                li.meaning, li.pronunciation, li.audio_data, li.example_usage, li.notes,
                li.created_at,
                MAX(fs.shown_at) AS last_reviewed,
                COUNT(fs.id) AS review_count,
                COALESCE(SUM(CASE WHEN fs.was_correct = 1 THEN 1 ELSE 0 END), 0)
                    AS correct_count
         FROM learning_items li
         LEFT JOIN flashcard_sessions fs ON li.id = fs.item_id
         WHERE li.user_id = ?",
    );
    let mut args: Vec<Box<dyn ToSql + Send>> = vec![Box::new(user_id)];

    if let Some(language_id) = query.language_id {
        sql.push_str(" AND li.language_id = ?");
        args.push(Box::new(language_id));
    }
    if let Some(threshold) = filter.threshold(Utc::now()) {
        sql.push_str(" AND li.created_at >= ?");
        args.push(Box::new(util::timestamp(threshold)));
    }
    sql.push_str(" GROUP BY li.id ORDER BY li.created_at DESC, li.id DESC");

    let conn = db.lock().await;
    let cards = {
        let mut stmt = conn.prepare(&sql).map_err(Error::from)?;
        let rows = stmt
            .query_map(
                params_from_iter(args.iter().map(|a| a.as_ref() as &dyn ToSql)),
                FlashcardItem::from_row,
            )
            .map_err(Error::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        rows
    };

    Ok(json(&cards))
}

/// One recorded review event against a learning item. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardSession {
    pub id: i64,
    pub user_id: i64,
    pub language_id: i64,
    pub item_id: i64,
    pub was_correct: bool,
    pub shown_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSessionReq {
    pub user_id: i64,
    pub language_id: i64,
    pub item_id: i64,
    pub was_correct: bool,
}

async fn record_session(req: RecordSessionReq, db: db::Db) -> Result<Json, Rejection> {
    if req.user_id == 0 || req.language_id == 0 || req.item_id == 0 {
        return Err(Error::BadRequest(
            "user_id, language_id, and item_id are required".to_string(),
        )
        .into());
    }

    let conn = db.lock().await;
    db::require_user(&conn, req.user_id)?;
    db::require_language(&conn, req.language_id)?;
    db::require_item(&conn, req.item_id)?;

    let shown_at = util::now();
    conn.execute(
        "INSERT INTO flashcard_sessions (user_id, language_id, item_id, was_correct, shown_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            req.user_id,
            req.language_id,
            req.item_id,
            req.was_correct,
            shown_at,
        ],
    )
    .map_err(Error::from)?;

    Ok(json(&FlashcardSession {
        id: conn.last_insert_rowid(),
        user_id: req.user_id,
        language_id: req.language_id,
        item_id: req.item_id,
        was_correct: req.was_correct,
        shown_at,
    }))
}
