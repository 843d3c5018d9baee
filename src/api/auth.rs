use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_email, validate_optional_text, validate_password, validate_username};
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::UserRole;
use crate::models::User;
use crate::services::{AuthError, AuthSession, RegisterRequest, UserInfo};

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::Unauthorized(msg) => Self::Unauthorized(msg),
            AuthError::Forbidden(msg) => Self::Forbidden(msg),
            AuthError::Conflict(msg) => Self::Conflict(msg),
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct EmailVerificationRequest {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves `Authorization: Bearer <access token>` to a live [`User`] and
/// stores it in the request extensions for the handlers.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let user = state.auth_service().authenticate(token).await?;
    tracing::Span::current().record("user_id", user.id.value());

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        let token = token.trim();
        return (!token.is_empty()).then_some(token);
    }
    None
}

/// Admin routes: role `super_admin` only. Runs after [`auth_middleware`].
pub async fn require_super_admin(
    Extension(user): Extension<User>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if user.role != UserRole::SuperAdmin {
        return Err(ApiError::forbidden("Super admin access required"));
    }
    Ok(next.run(request).await)
}

/// Company routes: role `company` only. Runs after [`auth_middleware`].
pub async fn require_company_user(
    Extension(user): Extension<User>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if user.role != UserRole::Company {
        return Err(ApiError::forbidden("Company access required"));
    }
    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthSession>>), ApiError> {
    payload.email = validate_email(&payload.email)?;
    validate_username(payload.username.trim())?;
    validate_password(&payload.password)?;
    payload.company_name = validate_optional_text("company_name", payload.company_name)?;
    payload.full_name = validate_optional_text("full_name", payload.full_name)?;

    let session = state.auth_service().register(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthSession>>, ApiError> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let session = state
        .auth_service()
        .login(&payload.username, &payload.password)
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<AuthSession>>, ApiError> {
    let session = state.auth_service().refresh(&payload.refresh_token).await?;
    Ok(Json(ApiResponse::success(session)))
}

/// POST /auth/password-reset/request
/// Same answer whether or not the email is registered.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validate_email(&payload.email)?;
    state.auth_service().request_password_reset(&email).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "If the email exists, a password reset link has been sent",
    ))))
}

/// POST /auth/password-reset/confirm
pub async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetConfirm>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_password(&payload.new_password)?;
    state
        .auth_service()
        .confirm_password_reset(&payload.token, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password has been reset successfully",
    ))))
}

/// POST /auth/verify-email
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailVerificationRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.auth_service().verify_email(&payload.token).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Email verified successfully",
    ))))
}

/// POST /auth/resend-verification
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.auth_service().resend_verification(&user).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Verification email sent",
    ))))
}

/// POST /auth/logout
/// Tokens are stateless; the client drops them.
pub async fn logout(Extension(user): Extension<User>) -> Json<ApiResponse<MessageResponse>> {
    tracing::info!(event = "user_logout", user_id = %user.id);
    Json(ApiResponse::success(MessageResponse::new(
        "Successfully logged out",
    )))
}

/// POST /auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_password(&payload.new_password)?;
    state
        .auth_service()
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let info = state.auth_service().current_user(&user).await?;
    Ok(Json(ApiResponse::success(info)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def"));

        headers.insert("Authorization", HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_auth_error_statuses() {
        assert!(matches!(
            ApiError::from(AuthError::InvalidCredentials),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(AuthError::Conflict("taken".into())),
            ApiError::Conflict(_)
        ));
    }
}
