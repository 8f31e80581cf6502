//! API key authentication and the operator guard.

mod extractor;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::AuthenticatedUser;

/// Hex SHA-256 of an API key, as stored in `users.api_key_hash`.
pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Fail with 403 unless `user` operates `company_id`.
pub async fn require_operator(
    pool: &DbPool,
    user: &AuthenticatedUser,
    company_id: Uuid,
) -> AppResult<()> {
    if pool.is_operator(user.id, company_id).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {} is not an operator of company {}",
            user.id, company_id
        )))
    }
}
