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

use std::convert::Infallible;

use warp::{Filter, Reply};

use language_learner::{item::LearningItem, language::Language};

mod common;

async fn create_language(
    api: &(impl Filter<Extract = impl Reply, Error = Infallible> + Clone + 'static),
    user_id: i64,
    code: &str,
    name: &str,
) -> i64 {
    let res = warp::test::request()
        .method("POST")
        .path("/api/languages")
        .header("Content-Type", "application/json")
        .json(&serde_json::json!({
            "user_id": user_id,
            "language_code": code,
            "language_name": name,
        }))
        .reply(api)
        .await;
    assert_eq!(res.status(), 200, "language created");
    let language: Language = serde_json::from_slice(res.body()).expect("language body");
    language.id
}

async fn create_item(
    api: &(impl Filter<Extract = impl Reply, Error = Infallible> + Clone + 'static),
    user_id: i64,
    language_id: i64,
    content: &str,
) -> LearningItem {
    let res = warp::test::request()
        .method("POST")
        .path("/api/items")
        .header("Content-Type", "application/json")
        .json(&serde_json::json!({
            "user_id": user_id,
            "language_id": language_id,
            "type": "word",
            "content": content,
            "translation": "hello",
        }))
        .reply(api)
        .await;
    assert_eq!(res.status(), 200, "item created");
    serde_json::from_slice(res.body()).expect("item body")
}

async fn list_items(
    api: &(impl Filter<Extract = impl Reply, Error = Infallible> + Clone + 'static),
    query: &str,
) -> Vec<LearningItem> {
    let res = warp::test::request()
        .method("GET")
        .path(&format!("/api/items?{}", query))
        .reply(api)
        .await;
    assert_eq!(res.status(), 200, "items listed");
    serde_json::from_slice(res.body()).expect("items body")
}

#[tokio::test]
async fn create_list_delete_items() {
    let api = common::test_app();
    let user_id = common::signup(&api, "alice", "secret1").await;
    let language_id = create_language(&api, user_id, "es", "Spanish").await;

    let created = create_item(&api, user_id, language_id, "hola").await;
    assert!(created.id > 0);
    assert_eq!(created.item_type, "word");
    assert_eq!(created.translation.as_deref(), Some("hello"));

    let items = list_items(&api, &format!("user_id={}", user_id)).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "hola");

    let res = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/items/delete?id={}", created.id))
        .reply(&api)
        .await;
    assert_eq!(res.status(), 200, "item deleted");

    let items = list_items(&api, &format!("user_id={}", user_id)).await;
    assert!(items.is_empty(), "deleted item no longer listed");
}

#[tokio::test]
async fn items_filter_by_language() {
    let api = common::test_app();
    let user_id = common::signup(&api, "alice", "secret1").await;
    let spanish = create_language(&api, user_id, "es", "Spanish").await;
    let french = create_language(&api, user_id, "fr", "French").await;

    create_item(&api, user_id, spanish, "hola").await;
    create_item(&api, user_id, spanish, "adios").await;
    create_item(&api, user_id, french, "bonjour").await;

    let all = list_items(&api, &format!("user_id={}", user_id)).await;
    assert_eq!(all.len(), 3);

    let spanish_items =
        list_items(&api, &format!("user_id={}&language_id={}", user_id, spanish)).await;
    assert_eq!(spanish_items.len(), 2);
    assert!(spanish_items.iter().all(|i| i.language_id == spanish));

    let french_items =
        list_items(&api, &format!("user_id={}&language_id={}", user_id, french)).await;
    assert_eq!(french_items.len(), 1);
    assert_eq!(french_items[0].content, "bonjour");
}

#[tokio::test]
async fn items_are_listed_newest_first() {
    let (db, api) = common::test_app_with_db();
    let user_id = common::signup(&api, "alice", "secret1").await;
    let language_id = create_language(&api, user_id, "es", "Spanish").await;

    let first = create_item(&api, user_id, language_id, "uno").await;
    let second = create_item(&api, user_id, language_id, "dos").await;

    // Backdate the first item so the ordering is unambiguous.
    {
        let conn = db.lock().await;
        conn.execute(
            "UPDATE learning_items SET created_at = '2020-01-01T00:00:00.000Z' WHERE id = ?1",
            [first.id],
        )
        .expect("backdate");
    }

    let items = list_items(&api, &format!("user_id={}", user_id)).await;
    assert_eq!(items[0].id, second.id);
    assert_eq!(items[1].id, first.id);
}

#[tokio::test]
async fn date_filter_windows_are_monotonic() {
    let (db, api) = common::test_app_with_db();
    let user_id = common::signup(&api, "alice", "secret1").await;
    let language_id = create_language(&api, user_id, "es", "Spanish").await;

    let today = create_item(&api, user_id, language_id, "hoy").await;
    let old = create_item(&api, user_id, language_id, "antiguo").await;
    let ancient = create_item(&api, user_id, language_id, "antiquo").await;

    // Push two items back in time: one 10 days, one 300 days.
    {
        let conn = db.lock().await;
        let backdate = |id: i64, ts: &str| {
            conn.execute(
                "UPDATE learning_items SET created_at = ?1 WHERE id = ?2",
                rusqlite::params![ts, id],
            )
            .expect("backdate");
        };
        let ten_days = chrono::Utc::now() - chrono::Duration::days(10);
        let long_ago = chrono::Utc::now() - chrono::Duration::days(300);
        backdate(
            old.id,
            &ten_days.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        );
        backdate(
            ancient.id,
            &long_ago.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        );
    }

    let mut counts = Vec::new();
    for filter in ["day", "week", "biweekly", "month", "all"] {
        let items = list_items(&api, &format!("user_id={}&date_filter={}", user_id, filter)).await;
        counts.push(items.len());
    }
    assert_eq!(counts, vec![1, 1, 2, 2, 3]);
    assert!(
        counts.windows(2).all(|w| w[0] <= w[1]),
        "each wider window is a superset"
    );

    // The freshest item appears in every window.
    for filter in ["day", "week", "biweekly", "month", "all"] {
        let items = list_items(&api, &format!("user_id={}&date_filter={}", user_id, filter)).await;
        assert!(items.iter().any(|i| i.id == today.id));
    }
}

#[tokio::test]
async fn item_validation() {
    let api = common::test_app();
    let user_id = common::signup(&api, "alice", "secret1").await;
    let language_id = create_language(&api, user_id, "es", "Spanish").await;

    let res = warp::test::request()
        .method("GET")
        .path("/api/items")
        .reply(&api)
        .await;
    assert_eq!(res.status(), 400, "user_id is required for listing");

    let res = warp::test::request()
        .method("GET")
        .path(&format!("/api/items?user_id={}&date_filter=fortnight", user_id))
        .reply(&api)
        .await;
    assert_eq!(res.status(), 400, "unknown date_filter is rejected");

    let res = warp::test::request()
        .method("POST")
        .path("/api/items")
        .header("Content-Type", "application/json")
        .json(&serde_json::json!({
            "user_id": user_id,
            "language_id": language_id,
            "type": "idiom",
            "content": "hola",
        }))
        .reply(&api)
        .await;
    assert_eq!(res.status(), 400, "unknown item type is rejected");

    let res = warp::test::request()
        .method("POST")
        .path("/api/items")
        .header("Content-Type", "application/json")
        .json(&serde_json::json!({
            "user_id": user_id,
            "language_id": language_id,
            "type": "word",
        }))
        .reply(&api)
        .await;
    assert_eq!(res.status(), 400, "content is required");

    let res = warp::test::request()
        .method("DELETE")
        .path("/api/items/delete")
        .reply(&api)
        .await;
    assert_eq!(res.status(), 400, "delete requires an id");

    let res = warp::test::request()
        .method("POST")
        .path("/api/items")
        .header("Content-Type", "application/json")
        .json(&serde_json::json!({
            "user_id": user_id,
            "language_id": language_id + 1,
            "type": "word",
            "content": "hola",
        }))
        .reply(&api)
        .await;
    assert_eq!(res.status(), 404, "unknown language is not found");
}
