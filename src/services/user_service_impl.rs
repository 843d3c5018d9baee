//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{AdFilter, Store, UserProfileUpdate};
use crate::models::User;
use crate::services::auth_service::UserInfo;
use crate::services::user_service::{UserActivity, UserError, UserService};

pub struct SeaOrmUserService {
    store: Store,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn info(&self, user: &User) -> Result<UserInfo, UserError> {
        let company_name = match user.company_id {
            Some(id) => self.store.get_company(id).await?.map(|c| c.name),
            None => None,
        };

        Ok(UserInfo::new(user, company_name))
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn profile(&self, user: &User) -> Result<UserInfo, UserError> {
        self.info(user).await
    }

    async fn update_profile(
        &self,
        user: &User,
        mut update: UserProfileUpdate,
    ) -> Result<UserInfo, UserError> {
        update.email = update.email.map(|e| e.trim().to_lowercase());

        if let Some(email) = update.email.as_deref()
            && email != user.email
            && self.store.is_email_taken(email, Some(user.id)).await?
        {
            return Err(UserError::Conflict("Email already in use".to_string()));
        }

        if let Some(username) = update.username.as_deref()
            && username != user.username
            && self.store.is_username_taken(username, Some(user.id)).await?
        {
            return Err(UserError::Conflict("Username already taken".to_string()));
        }

        let updated = self.store.update_user_profile(user.id, update).await?;
        info!(event = "profile_updated", user_id = %user.id);
        self.info(&updated).await
    }

    async fn delete_account(&self, user: &User) -> Result<(), UserError> {
        if !self.store.soft_delete_user(user.id).await? {
            return Err(UserError::NotFound);
        }
        info!(event = "account_deleted", user_id = %user.id);
        Ok(())
    }

    async fn activity(&self, user: &User) -> Result<UserActivity, UserError> {
        let mine = AdFilter {
            user_id: Some(user.id),
            ..AdFilter::default()
        };

        let total_ads_created = self.store.count_user_ads(user.id).await?;
        let last_ad_created = self.store.last_ad_created_at(&mine).await?;
        let total_evaluations = self
            .store
            .count_ads(&AdFilter {
                evaluated: Some(true),
                ..mine
            })
            .await?;

        Ok(UserActivity {
            user_id: user.id,
            total_ads_created,
            last_ad_created,
            total_evaluations,
            account_created: user.created_at.clone(),
            last_login: user.last_login.clone(),
        })
    }
}
