//! Domain service for platform administration.
//!
//! Callers are super admins; nothing here is tenant scoped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::{AdId, CompanyId, UserId, UserRole};
use crate::models::{Company, User};
use crate::services::analytics::DailyActivity;
use crate::services::company_service::{EventCount, RecentAd};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for AdminError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: AdId,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub company: String,
    pub event: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopCompany {
    pub id: CompanyId,
    pub name: String,
    pub ads_generated: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub total_companies: u64,
    pub active_companies: u64,
    pub total_users: u64,
    pub total_ads_generated: u64,
    pub ads_generated_today: u64,
    pub ads_generated_this_month: u64,
    pub total_regenerations: u64,
    pub average_evaluation_score: f64,
    pub recent_activities: Vec<Activity>,
    pub top_companies: Vec<TopCompany>,
}

#[derive(Debug, Clone)]
pub struct CompanyListQuery {
    pub page: u64,
    pub per_page: u64,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanySummary {
    pub id: CompanyId,
    pub name: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub total_ads: u64,
    pub total_users: u64,
    pub ads_this_month: i32,
    pub monthly_limit: i32,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyList {
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub companies: Vec<CompanySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyMember {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<User> for CompanyMember {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            full_name: u.full_name,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub users: Vec<CompanyMember>,
    pub recent_ads: Vec<RecentAd>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopAd {
    pub id: AdId,
    pub headline: String,
    pub event: String,
    pub company: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyRanking {
    pub name: String,
    pub ads_generated: u64,
    pub average_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformStatistics {
    pub period_start: String,
    pub period_end: String,
    pub total_ads: u64,
    pub total_regenerations: u64,
    pub total_evaluations: u64,
    pub unique_companies: u64,
    pub active_users: u64,
    pub daily_stats: Vec<DailyActivity>,
    pub platform_distribution: BTreeMap<String, u64>,
    pub event_distribution: Vec<EventCount>,
    pub top_performing_ads: Vec<TopAd>,
    pub company_rankings: Vec<CompanyRanking>,
}

#[derive(Debug, Clone)]
pub struct UserListQuery {
    pub page: u64,
    pub per_page: u64,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminUserView {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub company: Option<String>,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserList {
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub users: Vec<AdminUserView>,
}

#[async_trait::async_trait]
pub trait AdminService: Send + Sync {
    async fn dashboard(&self) -> Result<AdminDashboard, AdminError>;

    async fn list_companies(&self, query: CompanyListQuery) -> Result<CompanyList, AdminError>;

    async fn company_detail(&self, id: CompanyId) -> Result<CompanyDetail, AdminError>;

    /// Defaults to the last 30 days.
    async fn statistics(&self, query: StatisticsQuery) -> Result<PlatformStatistics, AdminError>;

    async fn set_company_active(&self, id: CompanyId, is_active: bool) -> Result<(), AdminError>;

    /// # Errors
    ///
    /// Returns [`AdminError::Validation`] when `limit` is negative or above
    /// the configured maximum.
    async fn set_company_limit(&self, id: CompanyId, limit: i32) -> Result<(), AdminError>;

    async fn list_users(&self, query: UserListQuery) -> Result<UserList, AdminError>;

    /// Removes the account row for good.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Conflict`] while the user still owns ads, and
    /// [`AdminError::Validation`] when an admin targets their own account.
    async fn delete_user(&self, admin: &User, id: UserId) -> Result<(), AdminError>;
}
