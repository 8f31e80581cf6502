//! Actix-web extractor for API key authentication.
//!
//! The key is wrapped in `SecretString` as soon as it leaves the header and
//! only its SHA-256 hash is compared against the database.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use futures_util::future::LocalBoxFuture;
use secrecy::{ExposeSecret, SecretString};

use super::hash_api_key;
use crate::config::API_KEY_HEADER;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::AuthenticatedUser;

/// Extract a secret header value, wrapping it in SecretString.
/// Returns None if the header is missing, empty or invalid UTF-8.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::from(s.to_string()))
}

/// Requires a valid `X-API-Key` header.
///
/// ```ignore
/// async fn protected(user: AuthenticatedUser) -> impl Responder { ... }
/// ```
impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = req.app_data::<web::Data<DbPool>>().cloned();
        let provided = extract_secret_header(req, API_KEY_HEADER);

        Box::pin(async move {
            let pool = pool.ok_or_else(|| {
                AppError::Database("Database pool not configured".to_string())
            })?;
            let key = provided.ok_or_else(|| {
                AppError::Unauthorized("Missing API key. Provide X-API-Key header.".to_string())
            })?;

            let hash = hash_api_key(key.expose_secret());
            pool.find_user_by_api_key_hash(&hash)
                .await?
                .map(AuthenticatedUser::from)
                .ok_or_else(|| AppError::Unauthorized("Invalid API key".to_string()))
        })
    }
}
