use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::validation::{validate_email, validate_optional_text, validate_username};
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::db::UserProfileUpdate;
use crate::models::User;
use crate::services::UserError;
use crate::services::UserInfo;
use crate::services::user_service::UserActivity;

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => Self::NotFound("User not found".to_string()),
            UserError::Conflict(msg) => Self::Conflict(msg),
            UserError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

/// GET /users/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let profile = state.user_service().profile(&user).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /users/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<UserProfileUpdate>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let update = UserProfileUpdate {
        email: payload.email.as_deref().map(validate_email).transpose()?,
        username: payload
            .username
            .as_deref()
            .map(|u| validate_username(u.trim()).map(str::to_string))
            .transpose()?,
        full_name: validate_optional_text("full_name", payload.full_name)?,
        phone: validate_optional_text("phone", payload.phone)?,
    };

    let profile = state.user_service().update_profile(&user, update).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// DELETE /users/profile
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.user_service().delete_account(&user).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Account deleted successfully",
    ))))
}

/// GET /users/activity
pub async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<UserActivity>>, ApiError> {
    let activity = state.user_service().activity(&user).await?;
    Ok(Json(ApiResponse::success(activity)))
}
