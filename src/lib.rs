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

pub mod guard;

pub mod auth;
pub mod flashcard;
pub mod item;
pub mod language;

pub mod db;
pub mod util;

mod error;
pub use error::{handle_rejects, Error};

/// Composes the full API under `/api`. The storage handle and signing keys
/// are constructed by the caller and injected here; the library holds no
/// global state.
pub fn app(
    db: db::Db,
    keys: auth::JwtKeys,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let auth_api = auth::api(db.clone(), keys);
    let language_api = language::api(db.clone());
    let item_api = item::api(db.clone());
    let flashcard_api = flashcard::api(db);

    warp::path("api")
        .and(auth_api.or(language_api).or(item_api).or(flashcard_api))
        .with(warp::filters::trace::request())
        .recover(handle_rejects)
}
