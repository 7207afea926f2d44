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

#![allow(dead_code)]

use std::convert::Infallible;

use warp::{Filter, Reply};

use language_learner::{app, auth::JwtKeys, db};

pub const SECRET: &[u8] = b"test-secret";

pub fn keys() -> JwtKeys {
    JwtKeys::from_secret(SECRET)
}

/// A fresh app over an in-memory database.
pub fn test_app() -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    test_app_with_db().1
}

/// As `test_app`, but also hands back the database so tests can inspect or
/// backdate rows directly.
pub fn test_app_with_db() -> (
    db::Db,
    impl Filter<Extract = impl Reply, Error = Infallible> + Clone,
) {
    let db = db::open_in_memory().expect("in-memory database");
    (db.clone(), app(db, keys()))
}

/// Signs up a user through the API and returns their id.
pub async fn signup(
    api: &(impl Filter<Extract = impl Reply, Error = Infallible> + Clone + 'static),
    username: &str,
    password: &str,
) -> i64 {
    let res = warp::test::request()
        .method("POST")
        .path("/api/auth/signup")
        .header("Content-Type", "application/json")
        .json(&serde_json::json!({
            "username": username,
            "password": password,
            "forgot_question": "Pet name?",
            "forgot_answer": "Rex",
        }))
        .reply(api)
        .await;
    assert_eq!(res.status(), 200, "signup succeeds");
    let body: serde_json::Value = serde_json::from_slice(res.body()).expect("signup body");
    body["userId"].as_i64().expect("userId in signup body")
}
