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

use std::iter;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use warp::{
    http::StatusCode,
    reply::{json, with_status, Json, WithStatus},
    Filter, Rejection, Reply,
};

use crate::{db, guard, util, Error};

const BCRYPT_COST: u32 = 10;
const TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// HS256 key pair for issuing and verifying session tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// The claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
}

pub fn api(
    db: db::Db,
    keys: JwtKeys,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let signup = warp::post()
        .and(warp::path("signup"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_db(db.clone()))
        .and_then(signup);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_db(db.clone()))
        .and(guard::with_keys(keys.clone()))
        .and_then(login);

    let verify = warp::post()
        .and(warp::path("verify"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_keys(keys))
        .and_then(verify);

    let forgot_password = warp::post()
        .and(warp::path("forgot-password"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_db(db.clone()))
        .and_then(forgot_password);

    let reset_password = warp::post()
        .and(warp::path("reset-password"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(guard::with_db(db))
        .and_then(reset_password);

    warp::path("auth").and(
        signup
            .or(login)
            .or(verify)
            .or(forgot_password)
            .or(reset_password),
    )
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupReq {
    pub username: String,
    pub password: String,
    pub forgot_question: String,
    pub forgot_answer: String,
}

#[derive(Serialize, Deserialize)]
pub struct SignupResp {
    pub success: bool,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub message: String,
}

async fn signup(req: SignupReq, db: db::Db) -> Result<Json, Rejection> {
    if req.username.is_empty()
        || req.password.is_empty()
        || req.forgot_question.is_empty()
        || req.forgot_answer.is_empty()
    {
        return Err(Error::BadRequest("All fields are required".to_string()).into());
    }

    let password_hash = hash_secret(&req.password)?;
    let forgot_answer_hash = hash_secret(&normalize_answer(&req.forgot_answer))?;

    let conn = db.lock().await;
    let taken = conn
        .query_row(
            "SELECT id FROM users WHERE username = ?1",
            [&req.username],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map_err(Error::from)?;
    if taken.is_some() {
        return Err(Error::BadRequest("Username already exists".to_string()).into());
    }

    conn.execute(
        "INSERT INTO users (username, password_hash, forgot_question, forgot_answer_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            req.username,
            password_hash,
            req.forgot_question,
            forgot_answer_hash,
            util::now(),
        ],
    )
    .map_err(Error::from)?;

    Ok(json(&SignupResp {
        success: true,
        user_id: conn.last_insert_rowid(),
        message: "User created successfully".to_string(),
    }))
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResp {
    pub success: bool,
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub username: String,
}

async fn login(req: LoginReq, db: db::Db, keys: JwtKeys) -> Result<Json, Rejection> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(Error::BadRequest("Username and password are required".to_string()).into());
    }

    let (user_id, password_hash) = {
        let conn = db.lock().await;
        conn.query_row(
            "SELECT id, password_hash FROM users WHERE username = ?1",
            [&req.username],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?)),
        )
        .optional()
        .map_err(Error::from)?
        .ok_or(Error::Unauthorized("Invalid username or password"))?
    };

    // The column is nullable for migration reasons; a NULL hash never matches.
    let password_hash =
        password_hash.ok_or(Error::Unauthorized("Invalid username or password"))?;
    if !verify_secret(&req.password, &password_hash) {
        return Err(Error::Unauthorized("Invalid username or password").into());
    }

    let token = issue_token(&keys, user_id, &req.username)?;
    Ok(json(&LoginResp {
        success: true,
        token,
        user_id,
        username: req.username,
    }))
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyReq {
    pub token: String,
}

#[derive(Serialize, Deserialize)]
pub struct VerifyResp {
    pub valid: bool,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Fails closed: any missing, malformed, expired, or forged token is an
/// ordinary `{valid: false}` response, never an error.
async fn verify(req: VerifyReq, keys: JwtKeys) -> Result<WithStatus<Json>, Rejection> {
    match verify_token(&keys, &req.token) {
        Some(claims) => Ok(with_status(
            json(&VerifyResp {
                valid: true,
                user_id: Some(claims.user_id),
                username: Some(claims.username),
            }),
            StatusCode::OK,
        )),
        None => Ok(with_status(
            json(&VerifyResp {
                valid: false,
                user_id: None,
                username: None,
            }),
            StatusCode::UNAUTHORIZED,
        )),
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordReq {
    pub username: String,
    pub forgot_answer: String,
}

#[derive(Serialize, Deserialize)]
pub struct ForgotPasswordResp {
    pub success: bool,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// Two-phase recovery on one route: without an answer it returns the user's
/// security question, with an answer it checks it against the stored hash.
async fn forgot_password(req: ForgotPasswordReq, db: db::Db) -> Result<Json, Rejection> {
    if req.username.is_empty() {
        return Err(Error::BadRequest("Username is required".to_string()).into());
    }

    let (user_id, question, answer_hash) = {
        let conn = db.lock().await;
        conn.query_row(
            "SELECT id, forgot_question, forgot_answer_hash FROM users WHERE username = ?1",
            [&req.username],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()
        .map_err(Error::from)?
        .ok_or(Error::NotFound("User"))?
    };

    if req.forgot_answer.is_empty() {
        return Ok(json(&ForgotPasswordResp {
            success: true,
            user_id,
            question,
        }));
    }

    let answer_hash = answer_hash.ok_or(Error::Unauthorized("Incorrect answer"))?;
    if !verify_secret(&normalize_answer(&req.forgot_answer), &answer_hash) {
        return Err(Error::Unauthorized("Incorrect answer").into());
    }

    Ok(json(&ForgotPasswordResp {
        success: true,
        user_id,
        question: None,
    }))
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetPasswordReq {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Serialize, Deserialize)]
pub struct ResetPasswordResp {
    pub success: bool,
    pub message: String,
}

async fn reset_password(req: ResetPasswordReq, db: db::Db) -> Result<Json, Rejection> {
    if req.user_id == 0 || req.new_password.is_empty() {
        return Err(
            Error::BadRequest("User ID and new password are required".to_string()).into(),
        );
    }

    let password_hash = hash_secret(&req.new_password)?;

    let conn = db.lock().await;
    conn.query_row(
        "SELECT id FROM users WHERE id = ?1",
        [req.user_id],
        |row| row.get::<_, i64>(0),
    )
    .optional()
    .map_err(Error::from)?
    .ok_or(Error::NotFound("User"))?;

    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, req.user_id],
    )
    .map_err(Error::from)?;

    Ok(json(&ResetPasswordResp {
        success: true,
        message: "Password reset successfully".to_string(),
    }))
}

/// One-way salted hash used for passwords and security answers.
pub fn hash_secret(secret: &str) -> Result<String, Error> {
    Ok(bcrypt::hash(secret, BCRYPT_COST)?)
}

pub fn verify_secret(secret: &str, digest: &str) -> bool {
    bcrypt::verify(secret, digest).unwrap_or(false)
}

/// Security answers are compared case-insensitively with surrounding
/// whitespace ignored; normalization happens before hashing and verifying.
fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

pub fn issue_token(keys: &JwtKeys, user_id: i64, username: &str) -> Result<String, Error> {
    let now = Utc::now().timestamp() as u64;
    let claims = Claims {
        user_id,
        username: username.to_string(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };
    Ok(encode(&Header::default(), &claims, &keys.encoding)?)
}

pub fn verify_token(keys: &JwtKeys, token: &str) -> Option<Claims> {
    decode::<Claims>(token, &keys.decoding, &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .ok()
}

pub fn random_string(len: usize) -> String {
    let mut rng = thread_rng();
    iter::repeat(())
        .map(|()| char::from(rng.sample(Alphanumeric)))
        .take(len)
        .collect::<String>()
}
