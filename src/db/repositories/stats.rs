use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::collections::HashMap;

use crate::domain::{AdStatus, AdType, CompanyId, UserId};
use crate::entities::{ads, prelude::*, users};
use crate::models::{Ad, parse_json_list};

/// Row filter shared by every ad aggregate. Bounds are inclusive timestamp
/// strings in the stored format.
#[derive(Debug, Clone, Default)]
pub struct AdFilter {
    pub company_id: Option<CompanyId>,
    pub user_id: Option<UserId>,
    pub created_from: Option<String>,
    pub created_to: Option<String>,
    pub evaluated_from: Option<String>,
    pub evaluated_to: Option<String>,
    pub ad_type: Option<AdType>,
    pub status: Option<AdStatus>,
    pub has_parent: Option<bool>,
    pub evaluated: Option<bool>,
}

impl AdFilter {
    #[must_use]
    pub fn for_company(company_id: CompanyId) -> Self {
        Self {
            company_id: Some(company_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn created_between(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(id) = self.company_id {
            cond = cond.add(ads::Column::CompanyId.eq(id.value()));
        }
        if let Some(id) = self.user_id {
            cond = cond.add(ads::Column::UserId.eq(id.value()));
        }
        if let Some(from) = &self.created_from {
            cond = cond.add(ads::Column::CreatedAt.gte(from.as_str()));
        }
        if let Some(to) = &self.created_to {
            cond = cond.add(ads::Column::CreatedAt.lte(to.as_str()));
        }
        if let Some(from) = &self.evaluated_from {
            cond = cond.add(ads::Column::EvaluatedAt.gte(from.as_str()));
        }
        if let Some(to) = &self.evaluated_to {
            cond = cond.add(ads::Column::EvaluatedAt.lte(to.as_str()));
        }
        if let Some(ad_type) = self.ad_type {
            cond = cond.add(ads::Column::AdType.eq(ad_type.as_str()));
        }
        if let Some(status) = self.status {
            cond = cond.add(ads::Column::Status.eq(status.as_str()));
        }
        match self.has_parent {
            Some(true) => cond = cond.add(ads::Column::ParentAdId.is_not_null()),
            Some(false) => cond = cond.add(ads::Column::ParentAdId.is_null()),
            None => {}
        }
        match self.evaluated {
            Some(true) => cond = cond.add(ads::Column::EvaluationScore.is_not_null()),
            Some(false) => cond = cond.add(ads::Column::EvaluationScore.is_null()),
            None => {}
        }

        cond
    }
}

/// Narrow projection used for Rust-side aggregation.
#[derive(Debug, Clone, FromQueryResult)]
pub struct AdActivityRow {
    pub id: i32,
    pub company_id: i32,
    pub user_id: i32,
    pub created_at: String,
    pub platforms: String,
    pub evaluation_score: Option<f64>,
}

impl AdActivityRow {
    #[must_use]
    pub fn platform_list(&self) -> Vec<String> {
        parse_json_list(&self.platforms)
    }
}

#[derive(Debug, Clone)]
pub struct CompanyAdCount {
    pub company_id: CompanyId,
    pub ad_count: u64,
    pub average_score: Option<f64>,
}

pub struct StatsRepository {
    conn: DatabaseConnection,
}

impl StatsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn count_ads(&self, filter: &AdFilter) -> Result<u64> {
        Ads::find()
            .filter(filter.condition())
            .count(&self.conn)
            .await
            .context("Failed to count ads")
    }

    /// Mean evaluation score over evaluated ads; `None` when nothing is scored.
    pub async fn average_score(&self, filter: &AdFilter) -> Result<Option<f64>> {
        let avg: Option<Option<f64>> = Ads::find()
            .select_only()
            .expr_as(
                Func::avg(Expr::col(ads::Column::EvaluationScore)),
                "average_score",
            )
            .filter(filter.condition())
            .filter(ads::Column::EvaluationScore.is_not_null())
            .into_tuple()
            .one(&self.conn)
            .await
            .context("Failed to average evaluation scores")?;

        Ok(avg.flatten())
    }

    pub async fn average_regeneration_count(&self, filter: &AdFilter) -> Result<f64> {
        let avg: Option<Option<f64>> = Ads::find()
            .select_only()
            .expr_as(
                Func::avg(Expr::col(ads::Column::RegenerationCount)),
                "average_regenerations",
            )
            .filter(filter.condition())
            .into_tuple()
            .one(&self.conn)
            .await
            .context("Failed to average regeneration counts")?;

        Ok(avg.flatten().unwrap_or(0.0))
    }

    pub async fn counts_by_status(&self, filter: &AdFilter) -> Result<HashMap<String, u64>> {
        self.grouped_counts(ads::Column::Status, filter).await
    }

    async fn grouped_counts(
        &self,
        column: ads::Column,
        filter: &AdFilter,
    ) -> Result<HashMap<String, u64>> {
        let rows: Vec<(String, i64)> = Ads::find()
            .select_only()
            .column(column)
            .column_as(ads::Column::Id.count(), "count")
            .filter(filter.condition())
            .group_by(column)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count ads by group")?;

        Ok(rows
            .into_iter()
            .map(|(key, count)| (key, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    /// Most frequent event names, highest count first.
    pub async fn top_events(&self, filter: &AdFilter, limit: u64) -> Result<Vec<(String, u64)>> {
        let rows: Vec<(String, i64)> = Ads::find()
            .select_only()
            .column(ads::Column::EventName)
            .column_as(ads::Column::Id.count(), "count")
            .filter(filter.condition())
            .group_by(ads::Column::EventName)
            .order_by(ads::Column::Id.count(), Order::Desc)
            .order_by_asc(ads::Column::EventName)
            .limit(limit)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to rank events")?;

        Ok(rows
            .into_iter()
            .map(|(event, count)| (event, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    /// Companies ranked by number of matching ads.
    pub async fn top_companies(&self, filter: &AdFilter, limit: u64) -> Result<Vec<CompanyAdCount>> {
        let rows: Vec<(i32, i64, Option<f64>)> = Ads::find()
            .select_only()
            .column(ads::Column::CompanyId)
            .column_as(ads::Column::Id.count(), "ad_count")
            .expr_as(
                Func::avg(Expr::col(ads::Column::EvaluationScore)),
                "average_score",
            )
            .filter(filter.condition())
            .group_by(ads::Column::CompanyId)
            .order_by(ads::Column::Id.count(), Order::Desc)
            .order_by_asc(ads::Column::CompanyId)
            .limit(limit)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to rank companies")?;

        Ok(rows
            .into_iter()
            .map(|(company_id, count, average_score)| CompanyAdCount {
                company_id: CompanyId::new(company_id),
                ad_count: u64::try_from(count).unwrap_or(0),
                average_score,
            })
            .collect())
    }

    pub async fn top_scored(&self, filter: &AdFilter, limit: u64) -> Result<Vec<Ad>> {
        let rows = Ads::find()
            .filter(filter.condition())
            .filter(ads::Column::EvaluationScore.is_not_null())
            .order_by_desc(ads::Column::EvaluationScore)
            .order_by_desc(ads::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query top scored ads")?;

        Ok(rows.into_iter().map(Ad::from).collect())
    }

    pub async fn activity_rows(&self, filter: &AdFilter) -> Result<Vec<AdActivityRow>> {
        Ads::find()
            .select_only()
            .column(ads::Column::Id)
            .column(ads::Column::CompanyId)
            .column(ads::Column::UserId)
            .column(ads::Column::CreatedAt)
            .column(ads::Column::Platforms)
            .column(ads::Column::EvaluationScore)
            .filter(filter.condition())
            .order_by_asc(ads::Column::CreatedAt)
            .into_model::<AdActivityRow>()
            .all(&self.conn)
            .await
            .context("Failed to query ad activity")
    }

    pub async fn last_created_at(&self, filter: &AdFilter) -> Result<Option<String>> {
        let latest: Option<Option<String>> = Ads::find()
            .select_only()
            .expr_as(Func::max(Expr::col(ads::Column::CreatedAt)), "latest")
            .filter(filter.condition())
            .into_tuple()
            .one(&self.conn)
            .await
            .context("Failed to query latest ad")?;

        Ok(latest.flatten())
    }

    pub async fn ad_counts_by_company(&self, ids: &[i32]) -> Result<HashMap<i32, u64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i32, i64)> = Ads::find()
            .select_only()
            .column(ads::Column::CompanyId)
            .column_as(ads::Column::Id.count(), "count")
            .filter(ads::Column::CompanyId.is_in(ids.to_vec()))
            .group_by(ads::Column::CompanyId)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count ads per company")?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    pub async fn user_counts_by_company(&self, ids: &[i32]) -> Result<HashMap<i32, u64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i32, i64)> = Users::find()
            .select_only()
            .column(users::Column::CompanyId)
            .column_as(users::Column::Id.count(), "count")
            .filter(users::Column::CompanyId.is_in(ids.to_vec()))
            .group_by(users::Column::CompanyId)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count users per company")?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InsertOutcome;
    use crate::db::repositories::fixtures::{new_ad, seeded_store};

    #[tokio::test]
    async fn test_filter_narrows_counts() {
        let (store, company_id, user_id) = seeded_store(10).await;

        let InsertOutcome::Created(root) = store
            .insert_ad_counted(new_ad(company_id, user_id, None))
            .await
            .unwrap()
        else {
            panic!("quota exhausted");
        };
        store
            .insert_ad_counted(new_ad(company_id, user_id, Some(root.id)))
            .await
            .unwrap();

        let all = AdFilter::for_company(company_id);
        assert_eq!(store.count_ads(&all).await.unwrap(), 2);
        assert_eq!(
            store
                .count_ads(&AdFilter {
                    has_parent: Some(true),
                    ..all.clone()
                })
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count_ads(&AdFilter {
                    ad_type: Some(AdType::ProductGen),
                    ..all.clone()
                })
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count_ads(&AdFilter::for_company(CompanyId::new(404)))
                .await
                .unwrap(),
            0
        );

        let by_status = store.ad_counts_by_status(&all).await.unwrap();
        assert_eq!(by_status.get("generated"), Some(&1));
        assert_eq!(by_status.get("regenerated"), Some(&1));
        assert!((store.average_regeneration_count(&all).await.unwrap() - 0.5).abs() < f64::EPSILON);
    }
}
