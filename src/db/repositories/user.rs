use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use sha2::{Digest, Sha256};
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::{CompanyId, UserId, UserRole};
use crate::entities::{prelude::*, users};
use crate::models::{User, now_timestamp};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub company_id: Option<CompanyId>,
    pub is_email_verified: bool,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UserProfileUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// Which one-time token column to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    PasswordReset,
    EmailVerification,
}

pub struct UserRepository {
    conn: DatabaseConnection,
    security: SecurityConfig,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, security: SecurityConfig) -> Self {
        Self { conn, security }
    }

    /// Get user by ID
    pub async fn get(&self, id: UserId) -> Result<Option<User>> {
        let user = Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Returns true when another account (not `except`) already uses the email.
    pub async fn email_taken(&self, email: &str, except: Option<UserId>) -> Result<bool> {
        let mut query = Users::find().filter(users::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(users::Column::Id.ne(id.value()));
        }
        Ok(query.count(&self.conn).await? > 0)
    }

    pub async fn username_taken(&self, username: &str, except: Option<UserId>) -> Result<bool> {
        let mut query = Users::find().filter(users::Column::Username.eq(username));
        if let Some(id) = except {
            query = query.filter(users::Column::Id.ne(id.value()));
        }
        Ok(query.count(&self.conn).await? > 0)
    }

    pub async fn create(&self, new: NewUser) -> Result<User> {
        let password = new.password;
        let security = self.security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .context("Password hashing task panicked")??;

        let now = now_timestamp();
        let model = users::ActiveModel {
            email: Set(new.email),
            username: Set(new.username),
            full_name: Set(new.full_name),
            phone: Set(new.phone),
            password_hash: Set(password_hash),
            role: Set(new.role.as_str().to_string()),
            is_email_verified: Set(new.is_email_verified),
            email_verification_token: Set(None),
            email_verification_sent_at: Set(None),
            password_reset_token: Set(None),
            password_reset_sent_at: Set(None),
            is_active: Set(true),
            is_deleted: Set(false),
            company_id: Set(new.company_id.map(|id| id.value())),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            last_login: Set(None),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    /// Looks a user up by username, or by email when the login contains '@',
    /// and checks the password.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_credentials(&self, login: &str, password: &str) -> Result<Option<User>> {
        let column = if login.contains('@') {
            users::Column::Email
        } else {
            users::Column::Username
        };

        let user = Users::find()
            .filter(column.eq(login))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        if check_password(user.password_hash.clone(), password).await? {
            Ok(Some(User::from(user)))
        } else {
            Ok(None)
        }
    }

    pub async fn verify_password(&self, id: UserId, password: &str) -> Result<bool> {
        let user = Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        match user {
            Some(user) => check_password(user.password_hash, password).await,
            None => Ok(false),
        }
    }

    /// Update password for a user (hashes the new password)
    pub async fn update_password(&self, id: UserId, new_password: &str) -> Result<()> {
        let user = self.find_model(id).await?;

        let password = new_password.to_string();
        let security = self.security.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .context("Password hashing task panicked")??;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.password_reset_token = Set(None);
        active.password_reset_sent_at = Set(None);
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn touch_last_login(&self, id: UserId) -> Result<()> {
        let user = self.find_model(id).await?;
        let now = now_timestamp();

        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(Some(now.clone()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Stores the digest of a freshly issued one-time token.
    pub async fn store_token(&self, id: UserId, kind: TokenKind, token: &str) -> Result<()> {
        let user = self.find_model(id).await?;
        let now = now_timestamp();
        let digest = hash_token(token);

        let mut active: users::ActiveModel = user.into();
        match kind {
            TokenKind::PasswordReset => {
                active.password_reset_token = Set(Some(digest));
                active.password_reset_sent_at = Set(Some(now.clone()));
            }
            TokenKind::EmailVerification => {
                active.email_verification_token = Set(Some(digest));
                active.email_verification_sent_at = Set(Some(now.clone()));
            }
        }
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Finds the user holding `token` and returns it with the issue timestamp.
    pub async fn find_by_token(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> Result<Option<(User, Option<String>)>> {
        let digest = hash_token(token);
        let column = match kind {
            TokenKind::PasswordReset => users::Column::PasswordResetToken,
            TokenKind::EmailVerification => users::Column::EmailVerificationToken,
        };

        let user = Users::find()
            .filter(column.eq(digest))
            .one(&self.conn)
            .await
            .context("Failed to query user by token")?;

        Ok(user.map(|model| {
            let sent_at = match kind {
                TokenKind::PasswordReset => model.password_reset_sent_at.clone(),
                TokenKind::EmailVerification => model.email_verification_sent_at.clone(),
            };
            (User::from(model), sent_at)
        }))
    }

    pub async fn mark_email_verified(&self, id: UserId) -> Result<()> {
        let user = self.find_model(id).await?;

        let mut active: users::ActiveModel = user.into();
        active.is_email_verified = Set(true);
        active.email_verification_token = Set(None);
        active.email_verification_sent_at = Set(None);
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn update_profile(&self, id: UserId, update: UserProfileUpdate) -> Result<User> {
        let user = self.find_model(id).await?;

        let mut active: users::ActiveModel = user.into();
        if let Some(email) = update.email {
            active.email = Set(email);
        }
        if let Some(username) = update.username {
            active.username = Set(username);
        }
        if let Some(full_name) = update.full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(phone) = update.phone {
            active.phone = Set(Some(phone));
        }
        active.updated_at = Set(now_timestamp());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update user profile")?;

        Ok(User::from(model))
    }

    pub async fn soft_delete(&self, id: UserId) -> Result<bool> {
        let Some(user) = Users::find_by_id(id.value()).one(&self.conn).await? else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        active.is_deleted = Set(true);
        active.is_active = Set(false);
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn hard_delete(&self, id: UserId) -> Result<bool> {
        let result = Users::delete_by_id(id.value())
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<User>, u64)> {
        let mut query = Users::find()
            .filter(users::Column::IsDeleted.eq(false))
            .order_by_desc(users::Column::CreatedAt);

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(users::Column::Email.contains(term))
                    .add(users::Column::Username.contains(term))
                    .add(users::Column::FullName.contains(term)),
            );
        }

        let paginator = query.paginate(&self.conn, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items.into_iter().map(User::from).collect(), total))
    }

    pub async fn list_by_company(&self, company_id: CompanyId) -> Result<Vec<User>> {
        let rows = Users::find()
            .filter(users::Column::CompanyId.eq(company_id.value()))
            .order_by_asc(users::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list company users")?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Counts accounts that are not soft-deleted, optionally for one company.
    pub async fn count_live(&self, company_id: Option<CompanyId>) -> Result<u64> {
        let mut query = Users::find().filter(users::Column::IsDeleted.eq(false));
        if let Some(id) = company_id {
            query = query.filter(users::Column::CompanyId.eq(id.value()));
        }

        query
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    pub async fn count_super_admins(&self) -> Result<u64> {
        Users::find()
            .filter(users::Column::Role.eq(UserRole::SuperAdmin.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to count super admins")
    }

    async fn find_model(&self, id: UserId) -> Result<users::Model> {
        Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))
    }
}

async fn check_password(password_hash: String, password: &str) -> Result<bool> {
    let password = password.to_string();

    // Run CPU-intensive password verification in a blocking task
    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the argon2 crate defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a random one-time token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Only digests of one-time tokens are persisted.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_digest_is_stable() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), "abc");
        assert_eq!(hash_token("abc").len(), 64);
    }

    #[test]
    fn test_hash_password_with_config_verifies() {
        let config = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };
        let hash = hash_password("Secret#123", Some(&config)).unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"Secret#123", &parsed)
                .is_ok()
        );
    }
}
