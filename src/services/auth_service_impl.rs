//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AuthConfig, UsageConfig};
use crate::db::{NewCompany, NewUser, Store, TokenKind};
use crate::db::repositories::user::generate_token;
use crate::domain::UserRole;
use crate::models::User;
use crate::services::auth_service::{
    AuthError, AuthService, AuthSession, RegisterRequest, UserInfo, UserSummary, display_name,
};
use crate::services::mailer::{Email, EmailTemplates, Mailer};
use crate::services::tokens::{TokenIssuer, TokenType};

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenIssuer,
    mailer: Arc<dyn Mailer>,
    templates: EmailTemplates,
    auth: AuthConfig,
    default_monthly_ad_limit: i32,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        auth: AuthConfig,
        usage: &UsageConfig,
        mailer: Arc<dyn Mailer>,
        templates: EmailTemplates,
    ) -> Self {
        Self {
            store,
            tokens: TokenIssuer::new(&auth),
            mailer,
            templates,
            auth,
            default_monthly_ad_limit: usage.default_monthly_ad_limit,
        }
    }

    async fn session_for(&self, user: &User) -> Result<AuthSession, AuthError> {
        let company_name = self.company_name(user).await?;
        Ok(AuthSession {
            tokens: self.tokens.issue(user)?,
            user: UserSummary::new(user, company_name),
        })
    }

    async fn company_name(&self, user: &User) -> Result<Option<String>, AuthError> {
        let Some(company_id) = user.company_id else {
            return Ok(None);
        };
        Ok(self.store.get_company(company_id).await?.map(|c| c.name))
    }

    /// Delivery failures never fail the calling operation.
    async fn deliver(&self, email: Email) {
        let to = email.to.clone();
        if let Err(e) = self.mailer.send(email).await {
            warn!(to = %to, error = %e, "Failed to send email");
        }
    }

    async fn send_verification(&self, user: &User) -> Result<(), AuthError> {
        let token = generate_token();
        self.store
            .store_user_token(user.id, TokenKind::EmailVerification, &token)
            .await?;
        self.deliver(self.templates.verification(&user.email, &user.username, &token))
            .await;
        Ok(())
    }

    /// Looks up a one-time token and rejects it once `valid_for` has passed.
    async fn redeem(
        &self,
        kind: TokenKind,
        token: &str,
        valid_for: Duration,
    ) -> Result<Option<User>, AuthError> {
        let Some((user, sent_at)) = self.store.find_user_by_token(kind, token).await? else {
            return Ok(None);
        };

        let expired = token_expired(sent_at.as_deref(), valid_for, Utc::now());
        Ok((!expired).then_some(user))
    }
}

/// A token without a readable issue time counts as expired.
fn token_expired(sent_at: Option<&str>, valid_for: Duration, now: DateTime<Utc>) -> bool {
    sent_at
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .is_none_or(|sent| now - sent.with_timezone(&Utc) > valid_for)
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, request: RegisterRequest) -> Result<AuthSession, AuthError> {
        let email = request.email.trim().to_lowercase();
        let username = request.username.trim().to_string();

        if self.store.is_email_taken(&email, None).await? {
            return Err(AuthError::Conflict("Email already registered".to_string()));
        }
        if self.store.is_username_taken(&username, None).await? {
            return Err(AuthError::Conflict("Username already taken".to_string()));
        }

        let company_name = request
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let (role, company) = match company_name {
            Some(name) => {
                let company = match self.store.get_company_by_name(name).await? {
                    Some(existing) => existing,
                    None => {
                        let created = self
                            .store
                            .create_company(NewCompany {
                                name: name.to_string(),
                                email: Some(email.clone()),
                                monthly_ad_limit: self.default_monthly_ad_limit,
                            })
                            .await?;
                        info!(event = "company_created", company_id = %created.id, name = %created.name);
                        created
                    }
                };
                (UserRole::Company, Some(company))
            }
            None => {
                if self.store.count_super_admins().await? > 0 {
                    return Err(AuthError::Validation(
                        "company_name is required".to_string(),
                    ));
                }
                (UserRole::SuperAdmin, None)
            }
        };

        let user = self
            .store
            .create_user(NewUser {
                email,
                username,
                password: request.password,
                full_name: request.full_name,
                phone: request.phone,
                role,
                company_id: company.as_ref().map(|c| c.id),
                is_email_verified: !self.auth.email_verification_required,
            })
            .await?;

        info!(event = "user_registered", user_id = %user.id, role = %user.role);

        if self.auth.email_verification_required {
            self.send_verification(&user).await?;
        }
        self.deliver(self.templates.welcome(
            &user.email,
            &display_name(&user),
            company.as_ref().map(|c| c.name.as_str()),
        ))
        .await;

        Ok(AuthSession {
            tokens: self.tokens.issue(&user)?,
            user: UserSummary::new(&user, company.map(|c| c.name)),
        })
    }

    async fn login(&self, login: &str, password: &str) -> Result<AuthSession, AuthError> {
        let login = login.trim();
        let login = if login.contains('@') {
            login.to_lowercase()
        } else {
            login.to_string()
        };

        let user = self
            .store
            .verify_user_credentials(&login, password)
            .await?
            .filter(|u| u.is_active && !u.is_deleted)
            .ok_or(AuthError::InvalidCredentials)?;

        if self.auth.email_verification_required && !user.is_email_verified {
            return Err(AuthError::Forbidden(
                "Email not verified. Please verify your email first.".to_string(),
            ));
        }

        self.store.touch_last_login(user.id).await?;
        info!(event = "user_login", user_id = %user.id);

        self.session_for(&user).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let invalid = || AuthError::Unauthorized("Invalid refresh token".to_string());

        let user_id = self
            .tokens
            .verify(refresh_token, TokenType::Refresh)
            .and_then(|claims| claims.user_id())
            .ok_or_else(invalid)?;

        let user = self
            .store
            .get_user(user_id)
            .await?
            .filter(|u| u.is_active && !u.is_deleted)
            .ok_or_else(invalid)?;

        self.session_for(&user).await
    }

    async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let user_id = self
            .tokens
            .verify(access_token, TokenType::Access)
            .and_then(|claims| claims.user_id())
            .ok_or_else(|| AuthError::Unauthorized("Could not validate credentials".to_string()))?;

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("User not found".to_string()))?;

        if !user.is_active || user.is_deleted {
            return Err(AuthError::Unauthorized("Account is disabled".to_string()));
        }
        Ok(user)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.store.get_user_by_email(&email).await? else {
            info!(event = "password_reset_unknown_email", "Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_token();
        self.store
            .store_user_token(user.id, TokenKind::PasswordReset, &token)
            .await?;
        self.deliver(self.templates.password_reset(&user.email, &user.username, &token))
            .await;

        info!(event = "password_reset_requested", user_id = %user.id);
        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .redeem(
                TokenKind::PasswordReset,
                token,
                Duration::hours(self.auth.password_reset_hours),
            )
            .await?
            .ok_or_else(|| AuthError::Validation("Invalid or expired reset token".to_string()))?;

        self.store.update_user_password(user.id, new_password).await?;
        info!(event = "password_reset", user_id = %user.id);
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let user = self
            .redeem(
                TokenKind::EmailVerification,
                token,
                Duration::hours(self.auth.email_verification_hours),
            )
            .await?
            .ok_or_else(|| {
                AuthError::Validation("Invalid or expired verification token".to_string())
            })?;

        self.store.mark_email_verified(user.id).await?;
        info!(event = "email_verified", user_id = %user.id);
        Ok(())
    }

    async fn resend_verification(&self, user: &User) -> Result<(), AuthError> {
        if user.is_email_verified {
            return Err(AuthError::Validation("Email already verified".to_string()));
        }
        self.send_verification(user).await
    }

    async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        if !self
            .store
            .verify_user_password(user.id, current_password)
            .await?
        {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.store.update_user_password(user.id, new_password).await?;
        info!(event = "password_changed", user_id = %user.id);
        Ok(())
    }

    async fn current_user(&self, user: &User) -> Result<UserInfo, AuthError> {
        let company_name = self.company_name(user).await?;
        Ok(UserInfo::new(user, company_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry() {
        let now = DateTime::parse_from_rfc3339("2026-06-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let day = Duration::hours(24);

        assert!(!token_expired(Some("2026-06-10T01:00:00.000000Z"), day, now));
        assert!(token_expired(Some("2026-06-08T12:00:00.000000Z"), day, now));
        assert!(token_expired(None, day, now));
        assert!(token_expired(Some("last tuesday"), day, now));
    }
}
