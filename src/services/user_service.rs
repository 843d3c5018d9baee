//! Domain service for the signed-in user's own account.

use serde::Serialize;
use thiserror::Error;

use crate::db::UserProfileUpdate;
use crate::domain::UserId;
use crate::models::User;
use crate::services::auth_service::UserInfo;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserActivity {
    pub user_id: UserId,
    pub total_ads_created: u64,
    pub last_ad_created: Option<String>,
    pub total_evaluations: u64,
    pub account_created: String,
    pub last_login: Option<String>,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn profile(&self, user: &User) -> Result<UserInfo, UserError>;

    /// Applies the provided fields; email and username must stay unique.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::Conflict`] when another account already uses
    /// the new email or username.
    async fn update_profile(
        &self,
        user: &User,
        update: UserProfileUpdate,
    ) -> Result<UserInfo, UserError>;

    /// Marks the account deleted and inactive. Ads are kept.
    async fn delete_account(&self, user: &User) -> Result<(), UserError>;

    async fn activity(&self, user: &User) -> Result<UserActivity, UserError>;
}
