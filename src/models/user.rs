//! Authenticated caller.

use uuid::Uuid;

use crate::entity::user;

/// The user behind a verified API key.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub language: Option<String>,
}

impl From<user::Model> for AuthenticatedUser {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            language: m.language,
        }
    }
}
