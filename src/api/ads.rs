//! Ad generation endpoints.
//!
//! Handlers validate the request shape and hand off to [`AdService`], which
//! owns tenant scoping, quota and the AI calls.
//!
//! [`AdService`]: crate::services::AdService

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{
    validate_ad_id, validate_categories, validate_event_name, validate_instructions,
    validate_optional_text, validate_page,
};
use super::{ApiError, ApiResponse, AppState, default_page, default_per_page};
use crate::domain::{AdId, AdStatus};
use crate::models::User;
use crate::services::AdError;
use crate::services::ad_service::{
    AdListQuery, AdPage, AdResponse, EvaluateAdRequest, EvaluationResult, GenerateAdRequest,
    GenerateImageRequest, ImageResult, RegenerateAdRequest,
};

impl From<AdError> for ApiError {
    fn from(err: AdError) -> Self {
        match err {
            AdError::NotFound(id) => Self::not_found("Ad", id),
            AdError::Forbidden(msg) => Self::Forbidden(msg),
            AdError::QuotaExceeded { .. } => Self::QuotaExceeded(err.to_string()),
            AdError::Validation(msg) => Self::validation(msg),
            AdError::ExternalService(msg) => Self::ExternalServiceError(msg),
            AdError::ResponseFormat(msg) => Self::ResponseFormatError(msg),
            AdError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<String>,
}

/// POST /ads/generate
pub async fn generate_ad(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<GenerateAdRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AdResponse>>), ApiError> {
    let request = GenerateAdRequest {
        event_name: validate_event_name(&payload.event_name)?.to_string(),
        product_name: validate_optional_text("product_name", payload.product_name)?,
        product_categories: validate_categories(payload.product_categories)?,
        location: validate_optional_text("location", payload.location)?,
        company_name: validate_optional_text("company_name", payload.company_name)?,
    };

    let ad = state.ad_service().generate_ad(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(ad))))
}

/// POST /ads/regenerate
pub async fn regenerate_ad(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<RegenerateAdRequest>,
) -> Result<Json<ApiResponse<AdResponse>>, ApiError> {
    validate_ad_id(payload.ad_id)?;
    validate_instructions(payload.additional_instructions.as_deref())?;

    let ad = state.ad_service().regenerate_ad(&user, payload).await?;
    Ok(Json(ApiResponse::success(ad)))
}

/// POST /ads/evaluate
pub async fn evaluate_ad(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<EvaluateAdRequest>,
) -> Result<Json<ApiResponse<EvaluationResult>>, ApiError> {
    let ad_id = validate_ad_id(payload.ad_id)?;
    let result = state.ad_service().evaluate_ad(&user, ad_id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /ads/generate-image
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<GenerateImageRequest>,
) -> Result<Json<ApiResponse<ImageResult>>, ApiError> {
    validate_ad_id(payload.ad_id)?;
    let result = state.ad_service().generate_image(&user, payload).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /ads?page&per_page&status
pub async fn list_ads(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(params): Query<AdListParams>,
) -> Result<Json<ApiResponse<AdPage>>, ApiError> {
    let (page, per_page) = validate_page(params.page, params.per_page)?;
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<AdStatus>)
        .transpose()
        .map_err(|e| ApiError::validation(format!("Invalid status filter: {e}")))?;

    let ads = state
        .ad_service()
        .list_company_ads(
            &user,
            AdListQuery {
                page,
                per_page,
                status,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(ads)))
}

/// GET /ads/{id}
pub async fn get_ad(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AdResponse>>, ApiError> {
    let id = validate_ad_id(AdId::new(id))?;
    let ad = state.ad_service().get_ad(&user, id).await?;
    Ok(Json(ApiResponse::success(ad)))
}

/// GET /ads/{id}/history
pub async fn ad_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<AdResponse>>>, ApiError> {
    let id = validate_ad_id(AdId::new(id))?;
    let history = state.ad_service().ad_history(&user, id).await?;
    Ok(Json(ApiResponse::success(history)))
}

/// DELETE /ads/{id}
pub async fn delete_ad(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let id = validate_ad_id(AdId::new(id))?;
    state.ad_service().delete_ad(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
