//! Domain service for generating, regenerating, evaluating and browsing ads.
//!
//! Every id-addressed operation is tenant scoped: the ad must belong to the
//! caller's company. There is no role bypass here; super admins inspect ads
//! through the admin service instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clients::dify::GatewayError;
use crate::domain::{AdId, AdStatus};
use crate::models::{Ad, User};

#[derive(Debug, Error)]
pub enum AdError {
    #[error("Ad not found: {0}")]
    NotFound(AdId),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Monthly ad generation limit of {limit} reached")]
    QuotaExceeded { limit: i32 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("AI service error: {0}")]
    ExternalService(String),

    #[error("AI response format error: {0}")]
    ResponseFormat(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for AdError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AdError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<GatewayError> for AdError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::ExternalService(msg) => Self::ExternalService(msg),
            GatewayError::ResponseFormat(msg) => Self::ResponseFormat(msg),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateAdRequest {
    pub event_name: String,
    pub product_name: Option<String>,
    pub product_categories: Vec<String>,
    pub location: Option<String>,
    /// Overrides the company name shown to the model.
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegenerateAdRequest {
    pub ad_id: AdId,
    /// `true` regenerates only the image, in place.
    #[serde(default)]
    pub regenerate_image: bool,
    pub additional_instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateAdRequest {
    pub ad_id: AdId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateImageRequest {
    pub ad_id: AdId,
    #[serde(default)]
    pub force_regenerate: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AdListQuery {
    pub page: u64,
    pub per_page: u64,
    pub status: Option<AdStatus>,
}

/// An ad as returned to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct AdResponse {
    #[serde(flatten)]
    pub ad: Ad,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdPage {
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub ads: Vec<AdResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub ad_id: AdId,
    pub relevance_score: f64,
    pub clarity_score: f64,
    pub persuasiveness_score: f64,
    pub brand_safety_score: f64,
    pub overall_score: f64,
    pub feedback: String,
    pub recommendations: Vec<String>,
    pub evaluated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageResult {
    pub ad_id: AdId,
    pub image_url: String,
    pub image_prompt: String,
    pub generated_at: String,
}

#[async_trait::async_trait]
pub trait AdService: Send + Sync {
    /// Generates copy, stores the ad against the caller's quota, then tries
    /// to attach an image.
    ///
    /// # Errors
    ///
    /// - [`AdError::Forbidden`] when the caller has no active company.
    /// - [`AdError::QuotaExceeded`] when the monthly limit is used up; no
    ///   counter changes and the AI service is not called.
    /// - [`AdError::ExternalService`] / [`AdError::ResponseFormat`] when
    ///   content generation fails. Image failures are only logged.
    async fn generate_ad(&self, user: &User, request: GenerateAdRequest)
    -> Result<AdResponse, AdError>;

    /// Image-only regeneration mutates the ad in place; full regeneration
    /// creates a child ad and counts against the quota.
    async fn regenerate_ad(
        &self,
        user: &User,
        request: RegenerateAdRequest,
    ) -> Result<AdResponse, AdError>;

    /// Returns the stored image unless `force_regenerate` is set.
    async fn generate_image(
        &self,
        user: &User,
        request: GenerateImageRequest,
    ) -> Result<ImageResult, AdError>;

    async fn evaluate_ad(&self, user: &User, ad_id: AdId) -> Result<EvaluationResult, AdError>;

    async fn list_company_ads(&self, user: &User, query: AdListQuery) -> Result<AdPage, AdError>;

    async fn get_ad(&self, user: &User, ad_id: AdId) -> Result<AdResponse, AdError>;

    /// The whole regeneration tree containing `ad_id`, oldest first.
    async fn ad_history(&self, user: &User, ad_id: AdId) -> Result<Vec<AdResponse>, AdError>;

    async fn delete_ad(&self, user: &User, ad_id: AdId) -> Result<(), AdError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_keep_their_kind() {
        let err: AdError = GatewayError::ExternalService("timeout".into()).into();
        assert!(matches!(err, AdError::ExternalService(_)));

        let err: AdError = GatewayError::ResponseFormat("No JSON object found".into()).into();
        assert_eq!(err.to_string(), "AI response format error: No JSON object found");
    }

    #[test]
    fn regenerate_request_defaults_to_full() {
        let req: RegenerateAdRequest = serde_json::from_str(r#"{"ad_id": 4}"#).unwrap();
        assert!(!req.regenerate_image);
        assert_eq!(req.ad_id, AdId::new(4));
    }
}
