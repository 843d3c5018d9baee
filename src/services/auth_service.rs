//! Domain service for authentication and account lifecycle.
//!
//! Handles registration, login, token refresh, password reset, email
//! verification and password changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CompanyId, UserId, UserRole};
use crate::models::User;
use crate::services::tokens::TokenPair;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect username/email or password")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Internal(format!("Token signing failed: {err}"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    /// Joins the named company, creating it if needed. Without it the
    /// account becomes the first super admin.
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    /// Display name: full name when set, else username.
    pub name: String,
    pub role: UserRole,
    pub company_id: Option<CompanyId>,
    pub company_name: Option<String>,
}

impl UserSummary {
    #[must_use]
    pub fn new(user: &User, company_name: Option<String>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            name: display_name(user),
            role: user.role,
            company_id: user.company_id,
            company_name,
        }
    }
}

#[must_use]
pub fn display_name(user: &User) -> String {
    user.full_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| user.username.clone())
}

/// Token pair plus the account it was issued for.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub company_id: Option<CompanyId>,
    pub company_name: Option<String>,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl UserInfo {
    #[must_use]
    pub fn new(user: &User, company_name: Option<String>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            name: display_name(user),
            phone: user.phone.clone(),
            role: user.role,
            is_email_verified: user.is_email_verified,
            company_id: user.company_id,
            company_name,
            created_at: user.created_at.clone(),
            last_login: user.last_login.clone(),
        }
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates the account and signs it in.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Conflict`] when the email or username is taken.
    /// - [`AuthError::Validation`] when no company is given and a super
    ///   admin already exists.
    async fn register(&self, request: RegisterRequest) -> Result<AuthSession, AuthError>;

    /// Accepts a username or an email as `login`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for a wrong password and for
    /// inactive or deleted accounts.
    async fn login(&self, login: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    /// Resolves a bearer access token to a live account.
    async fn authenticate(&self, access_token: &str) -> Result<User, AuthError>;

    /// Succeeds whether or not the email is registered.
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    async fn confirm_password_reset(&self, token: &str, new_password: &str)
    -> Result<(), AuthError>;

    async fn verify_email(&self, token: &str) -> Result<(), AuthError>;

    async fn resend_verification(&self, user: &User) -> Result<(), AuthError>;

    async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    async fn current_user(&self, user: &User) -> Result<UserInfo, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = User {
            id: UserId::new(1),
            email: "ana@acme.test".into(),
            username: "ana".into(),
            full_name: Some("  ".into()),
            phone: None,
            role: UserRole::Company,
            is_email_verified: true,
            is_active: true,
            is_deleted: false,
            company_id: None,
            created_at: String::new(),
            updated_at: String::new(),
            last_login: None,
        };
        assert_eq!(display_name(&user), "ana");

        user.full_name = Some("Ana Lima".into());
        assert_eq!(UserSummary::new(&user, None).name, "Ana Lima");
    }
}
