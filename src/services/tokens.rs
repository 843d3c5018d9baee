//! HS256 access and refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::domain::{UserId, UserRole};
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub company_id: Option<i32>,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse::<i32>().ok().map(UserId::new)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    fn sign(&self, user: &User, token_type: TokenType, ttl: Duration) -> jsonwebtoken::errors::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            company_id: user.company_id.map(|c| c.value()),
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn issue(&self, user: &User) -> jsonwebtoken::errors::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign(user, TokenType::Access, self.access_ttl)?,
            refresh_token: self.sign(user, TokenType::Refresh, self.refresh_ttl)?,
            token_type: "bearer",
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verifies signature and expiry, then checks the token type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Option<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).ok()?;
        (data.claims.token_type == expected).then_some(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CompanyId;

    fn user() -> User {
        User {
            id: UserId::new(7),
            email: "ana@acme.test".into(),
            username: "ana".into(),
            full_name: None,
            phone: None,
            role: UserRole::Company,
            is_email_verified: false,
            is_active: true,
            is_deleted: false,
            company_id: Some(CompanyId::new(3)),
            created_at: String::new(),
            updated_at: String::new(),
            last_login: None,
        }
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let pair = issuer.issue(&user()).unwrap();

        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 30 * 60);

        let claims = issuer.verify(&pair.access_token, TokenType::Access).unwrap();
        assert_eq!(claims.user_id(), Some(UserId::new(7)));
        assert_eq!(claims.company_id, Some(3));

        assert!(issuer.verify(&pair.access_token, TokenType::Refresh).is_none());
        assert!(issuer.verify(&pair.refresh_token, TokenType::Refresh).is_some());
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let other = TokenIssuer::new(&AuthConfig {
            jwt_secret: "another-secret-that-is-long-enough-xx".into(),
            ..AuthConfig::default()
        });

        let pair = other.issue(&user()).unwrap();
        assert!(issuer.verify(&pair.access_token, TokenType::Access).is_none());
        assert!(issuer.verify("not-a-token", TokenType::Access).is_none());
    }
}
