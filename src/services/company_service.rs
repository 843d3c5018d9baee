//! Domain service for a company's own dashboard, usage and profile.
//!
//! Only users with the `company` role whose company is active reach these
//! operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::db::CompanyProfileUpdate;
use crate::domain::{AdId, AdStatus, CompanyId};
use crate::models::{Ad, Company, User};
use crate::services::analytics::DailyActivity;

#[derive(Debug, Error)]
pub enum CompanyError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for CompanyError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CompanyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Short ad listing used on dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct RecentAd {
    pub id: AdId,
    pub event_name: String,
    pub headline: String,
    pub status: AdStatus,
    pub created_at: String,
}

impl From<Ad> for RecentAd {
    fn from(ad: Ad) -> Self {
        Self {
            id: ad.id,
            event_name: ad.event_name,
            headline: ad.content.headline,
            status: ad.status,
            created_at: ad.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyDashboard {
    pub company_id: CompanyId,
    pub company_name: String,
    pub total_ads_generated: u64,
    pub ads_generated_this_month: u64,
    pub monthly_limit: i32,
    pub remaining_monthly_limit: i32,
    pub average_evaluation_score: Option<f64>,
    pub recent_ads: Vec<RecentAd>,
}

/// Raw `start_date` / `end_date` query values: RFC 3339 or `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyUsage {
    pub company_id: CompanyId,
    pub period_start: String,
    pub period_end: String,
    pub total_generated: u64,
    pub total_regenerated: u64,
    pub total_evaluated: u64,
    pub daily_breakdown: Vec<DailyActivity>,
    pub platform_distribution: BTreeMap<String, u64>,
    pub remaining_monthly_limit: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyProfile {
    pub id: CompanyId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub description: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
}

impl From<Company> for CompanyProfile {
    fn from(c: Company) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            website: c.website,
            address: c.address,
            city: c.city,
            country: c.country,
            industry: c.industry,
            size: c.size,
            description: c.description,
            is_verified: c.is_verified,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventCount {
    pub event_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegenerationStats {
    pub total_regenerations: u64,
    pub average_regenerations_per_ad: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationStats {
    pub total_evaluated: u64,
    pub average_score: Option<f64>,
    pub score_distribution: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdStatistics {
    pub total_ads: u64,
    pub by_status: BTreeMap<&'static str, u64>,
    pub by_event: Vec<EventCount>,
    pub regeneration_stats: RegenerationStats,
    pub evaluation_stats: EvaluationStats,
}

#[async_trait::async_trait]
pub trait CompanyService: Send + Sync {
    async fn dashboard(&self, user: &User) -> Result<CompanyDashboard, CompanyError>;

    /// Defaults to the current month when either bound is missing.
    ///
    /// # Errors
    ///
    /// Returns [`CompanyError::Validation`] for unparseable dates or a start
    /// after the end.
    async fn usage(&self, user: &User, query: UsageQuery) -> Result<CompanyUsage, CompanyError>;

    async fn profile(&self, user: &User) -> Result<CompanyProfile, CompanyError>;

    async fn update_profile(
        &self,
        user: &User,
        update: CompanyProfileUpdate,
    ) -> Result<CompanyProfile, CompanyError>;

    async fn ad_statistics(&self, user: &User) -> Result<AdStatistics, CompanyError>;
}
