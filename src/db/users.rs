//! Database operations for users and company operators.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::{operator, user};
use crate::error::{AppError, AppResult};

use super::DbPool;

impl DbPool {
    /// Insert a user authenticated by the API key hashing to `api_key_hash`.
    pub async fn insert_user(
        &self,
        email: &str,
        language: Option<&str>,
        api_key_hash: &str,
    ) -> AppResult<user::Model> {
        let model = user::ActiveModel {
            id: Set(Uuid::now_v7()),
            email: Set(email.to_string()),
            first_name: Set(None),
            last_name: Set(None),
            language: Set(language.map(|s| s.to_string())),
            api_key_hash: Set(api_key_hash.to_string()),
            created_at: Set(Utc::now()),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert user: {}", e)))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: Uuid) -> AppResult<Option<user::Model>> {
        user::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get user: {}", e)))
    }

    /// Look up the user owning an API key hash.
    pub async fn find_user_by_api_key_hash(&self, hash: &str) -> AppResult<Option<user::Model>> {
        user::Entity::find()
            .filter(user::Column::ApiKeyHash.eq(hash))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to look up API key: {}", e)))
    }

    /// Make a user an operator of a company.
    pub async fn add_operator(&self, user_id: Uuid, company_id: Uuid) -> AppResult<operator::Model> {
        let model = operator::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(user_id),
            company_id: Set(company_id),
            created_at: Set(Utc::now()),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert operator: {}", e)))
    }

    /// Whether `user_id` may manage `company_id`.
    pub async fn is_operator(&self, user_id: Uuid, company_id: Uuid) -> AppResult<bool> {
        let count = operator::Entity::find()
            .filter(operator::Column::UserId.eq(user_id))
            .filter(operator::Column::CompanyId.eq(company_id))
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to check operator: {}", e)))?;

        Ok(count > 0)
    }
}
