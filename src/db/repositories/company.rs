use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::CompanyId;
use crate::entities::{companies, prelude::*};
use crate::models::{Company, now_timestamp};

#[derive(Debug, Clone, Default)]
pub struct NewCompany {
    pub name: String,
    pub email: Option<String>,
    pub monthly_ad_limit: i32,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CompanyProfileUpdate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub description: Option<String>,
}

pub struct CompanyRepository {
    conn: DatabaseConnection,
}

impl CompanyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: CompanyId) -> Result<Option<Company>> {
        let company = Companies::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query company by ID")?;

        Ok(company.map(Company::from))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Company>> {
        let company = Companies::find()
            .filter(companies::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query company by name")?;

        Ok(company.map(Company::from))
    }

    pub async fn get_many(&self, ids: &[i32]) -> Result<Vec<Company>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = Companies::find()
            .filter(companies::Column::Id.is_in(ids.to_vec()))
            .all(&self.conn)
            .await
            .context("Failed to query companies by IDs")?;

        Ok(rows.into_iter().map(Company::from).collect())
    }

    pub async fn create(&self, new: NewCompany) -> Result<Company> {
        let now = now_timestamp();

        let model = companies::ActiveModel {
            name: Set(new.name),
            email: Set(new.email),
            monthly_ad_limit: Set(new.monthly_ad_limit),
            ads_generated_this_month: Set(0),
            total_ads_generated: Set(0),
            is_active: Set(true),
            is_verified: Set(false),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert company")?;

        Ok(Company::from(model))
    }

    pub async fn update_profile(
        &self,
        id: CompanyId,
        update: CompanyProfileUpdate,
    ) -> Result<Option<Company>> {
        let Some(model) = Companies::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query company for profile update")?
        else {
            return Ok(None);
        };

        let mut active: companies::ActiveModel = model.into();
        let fields = [
            (update.email, companies::Column::Email),
            (update.phone, companies::Column::Phone),
            (update.website, companies::Column::Website),
            (update.address, companies::Column::Address),
            (update.city, companies::Column::City),
            (update.country, companies::Column::Country),
            (update.industry, companies::Column::Industry),
            (update.size, companies::Column::Size),
            (update.description, companies::Column::Description),
        ];
        for (value, column) in fields {
            if let Some(value) = value {
                active.set(column, Some(value).into());
            }
        }
        active.updated_at = Set(now_timestamp());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update company profile")?;

        Ok(Some(Company::from(model)))
    }

    pub async fn set_active(&self, id: CompanyId, is_active: bool) -> Result<bool> {
        let result = Companies::update_many()
            .col_expr(companies::Column::IsActive, Expr::value(is_active))
            .col_expr(companies::Column::UpdatedAt, Expr::value(now_timestamp()))
            .filter(companies::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to update company status")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn set_monthly_limit(&self, id: CompanyId, limit: i32) -> Result<bool> {
        let result = Companies::update_many()
            .col_expr(companies::Column::MonthlyAdLimit, Expr::value(limit))
            .col_expr(companies::Column::UpdatedAt, Expr::value(now_timestamp()))
            .filter(companies::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to update company limit")?;

        Ok(result.rows_affected > 0)
    }

    /// Zeroes the monthly counter of every company; returns the number touched.
    pub async fn reset_monthly_usage(&self) -> Result<u64> {
        let result = Companies::update_many()
            .col_expr(companies::Column::AdsGeneratedThisMonth, Expr::value(0))
            .col_expr(companies::Column::UpdatedAt, Expr::value(now_timestamp()))
            .exec(&self.conn)
            .await
            .context("Failed to reset monthly usage")?;

        Ok(result.rows_affected)
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        is_active: Option<bool>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Company>, u64)> {
        let mut query = Companies::find().order_by_desc(companies::Column::CreatedAt);

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(companies::Column::Name.contains(term))
                    .add(companies::Column::Email.contains(term)),
            );
        }

        if let Some(active) = is_active {
            query = query.filter(companies::Column::IsActive.eq(active));
        }

        let paginator = query.paginate(&self.conn, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items.into_iter().map(Company::from).collect(), total))
    }

    pub async fn count(&self, active_only: bool) -> Result<u64> {
        let mut query = Companies::find();
        if active_only {
            query = query.filter(companies::Column::IsActive.eq(true));
        }

        query
            .count(&self.conn)
            .await
            .context("Failed to count companies")
    }
}

/// Claims one generation slot for `company_id` on `db` (usually a transaction).
///
/// The increment is conditional on the counter still being below the limit,
/// so two concurrent generations cannot both take the last slot. Returns
/// `false` when the quota is exhausted.
pub async fn reserve_generation_slot<C: ConnectionTrait>(
    db: &C,
    company_id: CompanyId,
) -> Result<bool> {
    let result = Companies::update_many()
        .col_expr(
            companies::Column::AdsGeneratedThisMonth,
            Expr::col(companies::Column::AdsGeneratedThisMonth).add(1),
        )
        .col_expr(
            companies::Column::TotalAdsGenerated,
            Expr::col(companies::Column::TotalAdsGenerated).add(1),
        )
        .col_expr(companies::Column::UpdatedAt, Expr::value(now_timestamp()))
        .filter(companies::Column::Id.eq(company_id.value()))
        .filter(
            Expr::col(companies::Column::AdsGeneratedThisMonth)
                .lt(Expr::col(companies::Column::MonthlyAdLimit)),
        )
        .exec(db)
        .await
        .context("Failed to reserve generation slot")?;

    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::seeded_store;

    #[tokio::test]
    async fn test_reserve_slot_respects_limit_and_reset() {
        let (store, company_id, _) = seeded_store(2).await;

        assert!(reserve_generation_slot(&store.conn, company_id).await.unwrap());
        assert!(reserve_generation_slot(&store.conn, company_id).await.unwrap());
        assert!(!reserve_generation_slot(&store.conn, company_id).await.unwrap());

        assert_eq!(store.reset_monthly_usage().await.unwrap(), 1);
        let company = store.get_company(company_id).await.unwrap().unwrap();
        assert_eq!(company.ads_generated_this_month, 0);
        assert_eq!(company.total_ads_generated, 2);

        assert!(reserve_generation_slot(&store.conn, company_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_lowered_limit_blocks_further_slots() {
        let (store, company_id, _) = seeded_store(5).await;

        assert!(reserve_generation_slot(&store.conn, company_id).await.unwrap());
        assert!(store.set_company_monthly_limit(company_id, 1).await.unwrap());
        assert!(!reserve_generation_slot(&store.conn, company_id).await.unwrap());

        assert!(!store.set_company_monthly_limit(CompanyId::new(404), 3).await.unwrap());
    }
}
