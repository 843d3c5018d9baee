//! Super-admin endpoints. The role guard sits on the router; nothing here is
//! tenant scoped.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_page;
use super::{ApiError, ApiResponse, AppState, MessageResponse, default_page, default_per_page};
use crate::domain::{CompanyId, UserId};
use crate::models::User;
use crate::services::AdminError;
use crate::services::admin_service::{
    AdminDashboard, CompanyDetail, CompanyList, CompanyListQuery, PlatformStatistics,
    StatisticsQuery, UserList, UserListQuery,
};

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::NotFound(_) => Self::NotFound(err.to_string()),
            AdminError::Validation(msg) => Self::validation(msg),
            AdminError::Conflict(msg) => Self::Conflict(msg),
            AdminError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompanyListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub monthly_limit: i32,
}

fn non_blank(search: Option<String>) -> Option<String> {
    search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// GET /admin/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<AdminDashboard>>, ApiError> {
    let dashboard = state.admin_service().dashboard().await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

/// GET /admin/companies?page&per_page&search&is_active
pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompanyListParams>,
) -> Result<Json<ApiResponse<CompanyList>>, ApiError> {
    let (page, per_page) = validate_page(params.page, params.per_page)?;
    let companies = state
        .admin_service()
        .list_companies(CompanyListQuery {
            page,
            per_page,
            search: non_blank(params.search),
            is_active: params.is_active,
        })
        .await?;
    Ok(Json(ApiResponse::success(companies)))
}

/// GET /admin/companies/{id}
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CompanyDetail>>, ApiError> {
    let detail = state
        .admin_service()
        .company_detail(CompanyId::new(id))
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// GET /admin/statistics?start_date&end_date&company_id
pub async fn get_statistics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<ApiResponse<PlatformStatistics>>, ApiError> {
    let stats = state.admin_service().statistics(query).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// PUT /admin/companies/{id}/activate
pub async fn activate_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .admin_service()
        .set_company_active(CompanyId::new(id), true)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Company activated successfully",
    ))))
}

/// PUT /admin/companies/{id}/deactivate
pub async fn deactivate_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .admin_service()
        .set_company_active(CompanyId::new(id), false)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Company deactivated successfully",
    ))))
}

/// PUT /admin/companies/{id}/limits?monthly_limit=N
pub async fn update_company_limits(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(params): Query<LimitParams>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .admin_service()
        .set_company_limit(CompanyId::new(id), params.monthly_limit)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Monthly limit updated to {}",
        params.monthly_limit
    )))))
}

/// GET /admin/users?page&per_page&search
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserListParams>,
) -> Result<Json<ApiResponse<UserList>>, ApiError> {
    let (page, per_page) = validate_page(params.page, params.per_page)?;
    let users = state
        .admin_service()
        .list_users(UserListQuery {
            page,
            per_page,
            search: non_blank(params.search),
        })
        .await?;
    Ok(Json(ApiResponse::success(users)))
}

/// DELETE /admin/users/{id}
/// Permanent; refuses self-deletion and users that still own ads.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<User>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .admin_service()
        .delete_user(&admin, UserId::new(id))
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User deleted successfully",
    ))))
}
