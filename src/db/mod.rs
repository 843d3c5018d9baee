use crate::config::SecurityConfig;
use crate::domain::{AdId, AdStatus, CompanyId, UserId};
use crate::models::{Ad, AdEvaluation, Company, User};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::ad::{InsertOutcome, NewAd, NewEvaluation};
pub use repositories::company::{CompanyProfileUpdate, NewCompany};
pub use repositories::stats::{AdActivityRow, AdFilter, CompanyAdCount};
pub use repositories::user::{NewUser, TokenKind, UserProfileUpdate};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    security: SecurityConfig,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1, SecurityConfig::default()).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
        security: SecurityConfig,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to `:memory:` would see its own database.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn, security })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone(), self.security.clone())
    }

    fn company_repo(&self) -> repositories::company::CompanyRepository {
        repositories::company::CompanyRepository::new(self.conn.clone())
    }

    fn ad_repo(&self) -> repositories::ad::AdRepository {
        repositories::ad::AdRepository::new(self.conn.clone())
    }

    fn stats_repo(&self) -> repositories::stats::StatsRepository {
        repositories::stats::StatsRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn is_email_taken(&self, email: &str, except: Option<UserId>) -> Result<bool> {
        self.user_repo().email_taken(email, except).await
    }

    pub async fn is_username_taken(&self, username: &str, except: Option<UserId>) -> Result<bool> {
        self.user_repo().username_taken(username, except).await
    }

    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        self.user_repo().create(new).await
    }

    pub async fn verify_user_credentials(&self, login: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_credentials(login, password).await
    }

    pub async fn verify_user_password(&self, id: UserId, password: &str) -> Result<bool> {
        self.user_repo().verify_password(id, password).await
    }

    pub async fn update_user_password(&self, id: UserId, new_password: &str) -> Result<()> {
        self.user_repo().update_password(id, new_password).await
    }

    pub async fn touch_last_login(&self, id: UserId) -> Result<()> {
        self.user_repo().touch_last_login(id).await
    }

    pub async fn store_user_token(&self, id: UserId, kind: TokenKind, token: &str) -> Result<()> {
        self.user_repo().store_token(id, kind, token).await
    }

    pub async fn find_user_by_token(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> Result<Option<(User, Option<String>)>> {
        self.user_repo().find_by_token(kind, token).await
    }

    pub async fn mark_email_verified(&self, id: UserId) -> Result<()> {
        self.user_repo().mark_email_verified(id).await
    }

    pub async fn update_user_profile(&self, id: UserId, update: UserProfileUpdate) -> Result<User> {
        self.user_repo().update_profile(id, update).await
    }

    pub async fn soft_delete_user(&self, id: UserId) -> Result<bool> {
        self.user_repo().soft_delete(id).await
    }

    pub async fn hard_delete_user(&self, id: UserId) -> Result<bool> {
        self.user_repo().hard_delete(id).await
    }

    pub async fn list_users(
        &self,
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<User>, u64)> {
        self.user_repo().list(search, page, per_page).await
    }

    pub async fn list_company_users(&self, company_id: CompanyId) -> Result<Vec<User>> {
        self.user_repo().list_by_company(company_id).await
    }

    pub async fn count_live_users(&self, company_id: Option<CompanyId>) -> Result<u64> {
        self.user_repo().count_live(company_id).await
    }

    pub async fn count_super_admins(&self) -> Result<u64> {
        self.user_repo().count_super_admins().await
    }

    // ========================================================================
    // Companies
    // ========================================================================

    pub async fn get_company(&self, id: CompanyId) -> Result<Option<Company>> {
        self.company_repo().get(id).await
    }

    pub async fn get_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        self.company_repo().get_by_name(name).await
    }

    pub async fn create_company(&self, new: NewCompany) -> Result<Company> {
        self.company_repo().create(new).await
    }

    pub async fn update_company_profile(
        &self,
        id: CompanyId,
        update: CompanyProfileUpdate,
    ) -> Result<Option<Company>> {
        self.company_repo().update_profile(id, update).await
    }

    pub async fn set_company_active(&self, id: CompanyId, is_active: bool) -> Result<bool> {
        self.company_repo().set_active(id, is_active).await
    }

    pub async fn set_company_monthly_limit(&self, id: CompanyId, limit: i32) -> Result<bool> {
        self.company_repo().set_monthly_limit(id, limit).await
    }

    pub async fn reset_monthly_usage(&self) -> Result<u64> {
        self.company_repo().reset_monthly_usage().await
    }

    pub async fn list_companies(
        &self,
        search: Option<&str>,
        is_active: Option<bool>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Company>, u64)> {
        self.company_repo()
            .list(search, is_active, page, per_page)
            .await
    }

    pub async fn count_companies(&self, active_only: bool) -> Result<u64> {
        self.company_repo().count(active_only).await
    }

    /// Id -> name lookup for display purposes.
    pub async fn company_names(&self, ids: &[i32]) -> Result<HashMap<i32, String>> {
        let companies = self.company_repo().get_many(ids).await?;
        Ok(companies
            .into_iter()
            .map(|c| (c.id.value(), c.name))
            .collect())
    }

    // ========================================================================
    // Ads
    // ========================================================================

    pub async fn get_ad(&self, id: AdId) -> Result<Option<Ad>> {
        self.ad_repo().get(id).await
    }

    pub async fn insert_ad_counted(&self, new: NewAd) -> Result<InsertOutcome> {
        self.ad_repo().insert_counted(new).await
    }

    pub async fn set_ad_image_url(&self, id: AdId, image_url: &str) -> Result<()> {
        self.ad_repo().set_image_url(id, image_url).await
    }

    pub async fn apply_regenerated_image(
        &self,
        id: AdId,
        image_prompt: Option<String>,
        image_url: &str,
    ) -> Result<Ad> {
        self.ad_repo()
            .apply_regenerated_image(id, image_prompt, image_url)
            .await
    }

    pub async fn record_ad_evaluation(
        &self,
        id: AdId,
        evaluation: NewEvaluation,
    ) -> Result<(Ad, AdEvaluation)> {
        self.ad_repo().record_evaluation(id, evaluation).await
    }

    pub async fn list_company_ads(
        &self,
        company_id: CompanyId,
        status: Option<AdStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Ad>, u64)> {
        self.ad_repo()
            .list_for_company(company_id, status, page, per_page)
            .await
    }

    pub async fn recent_ads(&self, company_id: Option<CompanyId>, limit: u64) -> Result<Vec<Ad>> {
        self.ad_repo().recent(company_id, limit).await
    }

    pub async fn ad_lineage(&self, id: AdId) -> Result<Vec<Ad>> {
        self.ad_repo().lineage(id).await
    }

    pub async fn delete_ad(&self, id: AdId) -> Result<bool> {
        self.ad_repo().delete(id).await
    }

    pub async fn get_ad_evaluations(&self, id: AdId) -> Result<Vec<AdEvaluation>> {
        self.ad_repo().evaluations(id).await
    }

    pub async fn count_user_ads(&self, user_id: UserId) -> Result<u64> {
        self.ad_repo().count_for_user(user_id).await
    }

    // ========================================================================
    // Aggregates
    // ========================================================================

    pub async fn count_ads(&self, filter: &AdFilter) -> Result<u64> {
        self.stats_repo().count_ads(filter).await
    }

    pub async fn average_evaluation_score(&self, filter: &AdFilter) -> Result<Option<f64>> {
        self.stats_repo().average_score(filter).await
    }

    pub async fn average_regeneration_count(&self, filter: &AdFilter) -> Result<f64> {
        self.stats_repo().average_regeneration_count(filter).await
    }

    pub async fn ad_counts_by_status(&self, filter: &AdFilter) -> Result<HashMap<String, u64>> {
        self.stats_repo().counts_by_status(filter).await
    }

    pub async fn top_events(&self, filter: &AdFilter, limit: u64) -> Result<Vec<(String, u64)>> {
        self.stats_repo().top_events(filter, limit).await
    }

    pub async fn top_companies(&self, filter: &AdFilter, limit: u64) -> Result<Vec<CompanyAdCount>> {
        self.stats_repo().top_companies(filter, limit).await
    }

    pub async fn top_scored_ads(&self, filter: &AdFilter, limit: u64) -> Result<Vec<Ad>> {
        self.stats_repo().top_scored(filter, limit).await
    }

    pub async fn ad_activity(&self, filter: &AdFilter) -> Result<Vec<AdActivityRow>> {
        self.stats_repo().activity_rows(filter).await
    }

    pub async fn last_ad_created_at(&self, filter: &AdFilter) -> Result<Option<String>> {
        self.stats_repo().last_created_at(filter).await
    }

    pub async fn ad_counts_by_company(&self, ids: &[i32]) -> Result<HashMap<i32, u64>> {
        self.stats_repo().ad_counts_by_company(ids).await
    }

    pub async fn user_counts_by_company(&self, ids: &[i32]) -> Result<HashMap<i32, u64>> {
        self.stats_repo().user_counts_by_company(ids).await
    }
}
