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

use std::env;

use tracing::{info, warn};

use language_learner::{app, auth, db};

const DEFAULT_DB_PATH: &str = "language_learner.db";
const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> Result<(), language_learner::Error> {
    tracing_subscriber::fmt::init();

    let db_path = env::var("DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let db = db::open(&db_path)?;

    let keys = match env::var("JWT_SECRET") {
        Ok(secret) => auth::JwtKeys::from_secret(secret.as_bytes()),
        _ => {
            warn!("JWT_SECRET not set; using a random per-process secret");
            auth::JwtKeys::from_secret(auth::random_string(32).as_bytes())
        }
    };

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    info!(port, "serving");
    warp::serve(app(db, keys)).run(([0, 0, 0, 0], port)).await;
    Ok(())
}
