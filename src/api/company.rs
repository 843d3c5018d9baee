use axum::{
    Extension, Json,
    extract::{Query, State},
};
use std::sync::Arc;

use super::validation::validate_optional_text;
use super::{ApiError, ApiResponse, AppState};
use crate::db::CompanyProfileUpdate;
use crate::models::User;
use crate::services::CompanyError;
use crate::services::company_service::{
    AdStatistics, CompanyDashboard, CompanyProfile, CompanyUsage, UsageQuery,
};

impl From<CompanyError> for ApiError {
    fn from(err: CompanyError) -> Self {
        match err {
            CompanyError::Forbidden(msg) => Self::Forbidden(msg),
            CompanyError::Validation(msg) => Self::validation(msg),
            CompanyError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

/// GET /company/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<CompanyDashboard>>, ApiError> {
    let dashboard = state.company_service().dashboard(&user).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

/// GET /company/usage?start_date&end_date
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<ApiResponse<CompanyUsage>>, ApiError> {
    let usage = state.company_service().usage(&user, query).await?;
    Ok(Json(ApiResponse::success(usage)))
}

/// GET /company/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<CompanyProfile>>, ApiError> {
    let profile = state.company_service().profile(&user).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /company/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<CompanyProfileUpdate>,
) -> Result<Json<ApiResponse<CompanyProfile>>, ApiError> {
    let update = CompanyProfileUpdate {
        email: payload
            .email
            .as_deref()
            .map(super::validation::validate_email)
            .transpose()?,
        phone: validate_optional_text("phone", payload.phone)?,
        website: validate_optional_text("website", payload.website)?,
        address: payload.address,
        city: validate_optional_text("city", payload.city)?,
        country: validate_optional_text("country", payload.country)?,
        industry: validate_optional_text("industry", payload.industry)?,
        size: validate_optional_text("size", payload.size)?,
        description: payload.description,
    };

    let profile = state.company_service().update_profile(&user, update).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// GET /company/ads/statistics
pub async fn get_ad_statistics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<AdStatistics>>, ApiError> {
    let stats = state.company_service().ad_statistics(&user).await?;
    Ok(Json(ApiResponse::success(stats)))
}
