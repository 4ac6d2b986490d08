//! Bearer-token session authentication.
//!
//! Sessions are issued by the external identity provider and recorded in
//! the `sessions` table with the token hashed; this module only resolves
//! incoming bearer tokens to user ids.

use axum::{extract::FromRequestParts, http::request::Parts};
use sha2::{Digest, Sha256};

use crate::db::{queries, AppState};
use crate::error::AppError;
use crate::util::extract_bearer_token;

/// Hash a session token for storage/lookup. SHA-256 with an application
/// salt, lowercase hex.
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"tollbooth-v1:");
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extractor for authenticated endpoints: resolves the Authorization
/// bearer token to a user id, or rejects with 401.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        let conn = state.db.get()?;
        let user_id = queries::get_session_user(&conn, token)?.ok_or(AppError::Unauthorized)?;

        Ok(SessionUser { user_id })
    }
}
