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

use warp::Filter;

use crate::{auth::JwtKeys, db};

pub fn with_db(db: db::Db) -> impl Filter<Extract = (db::Db,), Error = Infallible> + Clone {
    warp::any().map(move || db.clone())
}

pub fn with_keys(keys: JwtKeys) -> impl Filter<Extract = (JwtKeys,), Error = Infallible> + Clone {
    warp::any().map(move || keys.clone())
}
