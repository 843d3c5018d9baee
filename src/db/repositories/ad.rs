use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::company::reserve_generation_slot;
use crate::domain::{AdId, AdStatus, AdType, CompanyId, UserId};
use crate::entities::{ad_evaluations, ads, prelude::*};
use crate::models::{Ad, AdEvaluation, now_timestamp};

/// Upper bound on lineage walks; a chain deeper than this indicates corrupt data.
const MAX_LINEAGE_DEPTH: usize = 1000;

#[derive(Debug, Clone)]
pub struct NewAd {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub event_name: String,
    pub product_name: Option<String>,
    pub product_categories: Vec<String>,
    pub location: Option<String>,
    pub headline: String,
    pub description: String,
    pub slogan: String,
    pub cta_text: String,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub image_prompt: Option<String>,
    pub platforms: Vec<String>,
    pub platform_details: Map<String, Value>,
    pub recommended_posting_times: Vec<String>,
    pub budget_allocation: Map<String, Value>,
    pub status: AdStatus,
    pub ad_type: AdType,
    pub regeneration_count: i32,
    pub parent_ad_id: Option<AdId>,
    pub raw_response: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub relevance_score: f64,
    pub clarity_score: f64,
    pub persuasiveness_score: f64,
    pub brand_safety_score: f64,
    pub overall_score: f64,
    pub feedback: String,
    pub recommendations: Vec<String>,
    pub evaluator_model: String,
    pub evaluation_prompt: String,
    /// Serialized payload cached on the ad row.
    pub details: Value,
}

/// Outcome of an insert that had to claim a quota slot first.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Ad),
    QuotaExhausted,
}

pub struct AdRepository {
    conn: DatabaseConnection,
}

impl AdRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: AdId) -> Result<Option<Ad>> {
        let ad = Ads::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query ad by ID")?;

        Ok(ad.map(Ad::from))
    }

    /// Inserts the ad and claims a company quota slot in one transaction.
    pub async fn insert_counted(&self, new: NewAd) -> Result<InsertOutcome> {
        let txn = self.conn.begin().await?;

        if !reserve_generation_slot(&txn, new.company_id).await? {
            txn.rollback().await?;
            return Ok(InsertOutcome::QuotaExhausted);
        }

        let model = to_active_model(new)
            .insert(&txn)
            .await
            .context("Failed to insert ad")?;

        txn.commit().await?;
        Ok(InsertOutcome::Created(Ad::from(model)))
    }

    pub async fn set_image_url(&self, id: AdId, image_url: &str) -> Result<()> {
        Ads::update_many()
            .col_expr(ads::Column::ImageUrl, Expr::value(image_url))
            .col_expr(ads::Column::UpdatedAt, Expr::value(now_timestamp()))
            .filter(ads::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to set ad image")?;

        Ok(())
    }

    /// In-place image regeneration: new prompt/url and a bumped counter.
    pub async fn apply_regenerated_image(
        &self,
        id: AdId,
        image_prompt: Option<String>,
        image_url: &str,
    ) -> Result<Ad> {
        let model = Ads::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query ad for image update")?
            .ok_or_else(|| anyhow::anyhow!("Ad not found: {id}"))?;

        let regeneration_count = model.regeneration_count + 1;
        let mut active: ads::ActiveModel = model.into();
        if let Some(prompt) = image_prompt {
            active.image_prompt = Set(Some(prompt));
        }
        active.image_url = Set(Some(image_url.to_string()));
        active.regeneration_count = Set(regeneration_count);
        active.updated_at = Set(now_timestamp());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update ad image")?;

        Ok(Ad::from(model))
    }

    /// Appends an evaluation row and caches its result on the ad.
    pub async fn record_evaluation(
        &self,
        id: AdId,
        evaluation: NewEvaluation,
    ) -> Result<(Ad, AdEvaluation)> {
        let txn = self.conn.begin().await?;
        let now = now_timestamp();

        let stored = ad_evaluations::ActiveModel {
            ad_id: Set(id.value()),
            relevance_score: Set(evaluation.relevance_score),
            clarity_score: Set(evaluation.clarity_score),
            persuasiveness_score: Set(evaluation.persuasiveness_score),
            brand_safety_score: Set(evaluation.brand_safety_score),
            overall_score: Set(evaluation.overall_score),
            feedback: Set(evaluation.feedback),
            recommendations: Set(to_json(&evaluation.recommendations)),
            evaluator_model: Set(evaluation.evaluator_model),
            evaluation_prompt: Set(evaluation.evaluation_prompt),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert evaluation")?;

        let model = Ads::find_by_id(id.value())
            .one(&txn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Ad not found: {id}"))?;

        let mut active: ads::ActiveModel = model.into();
        active.evaluation_score = Set(Some(evaluation.overall_score));
        active.evaluation_details = Set(Some(evaluation.details.to_string()));
        active.evaluated_at = Set(Some(now.clone()));
        active.status = Set(AdStatus::Evaluated.as_str().to_string());
        active.updated_at = Set(now);
        let model = active.update(&txn).await?;

        txn.commit().await?;
        Ok((Ad::from(model), AdEvaluation::from(stored)))
    }

    pub async fn list_for_company(
        &self,
        company_id: CompanyId,
        status: Option<AdStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Ad>, u64)> {
        let mut query = Ads::find()
            .filter(ads::Column::CompanyId.eq(company_id.value()))
            .order_by_desc(ads::Column::CreatedAt)
            .order_by_desc(ads::Column::Id);

        if let Some(status) = status {
            query = query.filter(ads::Column::Status.eq(status.as_str()));
        }

        let paginator = query.paginate(&self.conn, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items.into_iter().map(Ad::from).collect(), total))
    }

    /// Newest ads, optionally for one company.
    pub async fn recent(&self, company_id: Option<CompanyId>, limit: u64) -> Result<Vec<Ad>> {
        let mut query = Ads::find()
            .order_by_desc(ads::Column::CreatedAt)
            .order_by_desc(ads::Column::Id)
            .limit(limit);

        if let Some(id) = company_id {
            query = query.filter(ads::Column::CompanyId.eq(id.value()));
        }

        let rows = query
            .all(&self.conn)
            .await
            .context("Failed to query recent ads")?;
        Ok(rows.into_iter().map(Ad::from).collect())
    }

    /// Every ad in the regeneration tree containing `id`, oldest first.
    ///
    /// Walks parent links up to the root, then collects descendants level by
    /// level. Returns an empty list when `id` does not exist.
    pub async fn lineage(&self, id: AdId) -> Result<Vec<Ad>> {
        let Some(mut current) = Ads::find_by_id(id.value()).one(&self.conn).await? else {
            return Ok(vec![]);
        };

        let mut seen = HashSet::from([current.id]);
        while let Some(parent_id) = current.parent_ad_id {
            if seen.len() > MAX_LINEAGE_DEPTH {
                anyhow::bail!("Lineage of ad {id} exceeds {MAX_LINEAGE_DEPTH} levels");
            }
            match Ads::find_by_id(parent_id).one(&self.conn).await? {
                Some(parent) if seen.insert(parent.id) => current = parent,
                _ => break,
            }
        }

        let mut tree = vec![current.clone()];
        let mut visited = HashSet::from([current.id]);
        let mut frontier = vec![current.id];
        while !frontier.is_empty() {
            let children = Ads::find()
                .filter(ads::Column::ParentAdId.is_in(frontier))
                .all(&self.conn)
                .await
                .context("Failed to query ad descendants")?;

            frontier = children
                .iter()
                .filter(|child| visited.insert(child.id))
                .map(|child| child.id)
                .collect();
            tree.extend(children.into_iter().filter(|c| frontier.contains(&c.id)));
        }

        tree.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tree.into_iter().map(Ad::from).collect())
    }

    /// Deletes the ad with its evaluations; children keep existing as roots.
    pub async fn delete(&self, id: AdId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        AdEvaluations::delete_many()
            .filter(ad_evaluations::Column::AdId.eq(id.value()))
            .exec(&txn)
            .await
            .context("Failed to delete ad evaluations")?;

        Ads::update_many()
            .col_expr(ads::Column::ParentAdId, Expr::value(Option::<i32>::None))
            .filter(ads::Column::ParentAdId.eq(id.value()))
            .exec(&txn)
            .await
            .context("Failed to detach ad children")?;

        let result = Ads::delete_by_id(id.value())
            .exec(&txn)
            .await
            .context("Failed to delete ad")?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn evaluations(&self, id: AdId) -> Result<Vec<AdEvaluation>> {
        let rows = AdEvaluations::find()
            .filter(ad_evaluations::Column::AdId.eq(id.value()))
            .order_by_asc(ad_evaluations::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to query ad evaluations")?;

        Ok(rows.into_iter().map(AdEvaluation::from).collect())
    }

    pub async fn count_for_user(&self, user_id: UserId) -> Result<u64> {
        Ads::find()
            .filter(ads::Column::UserId.eq(user_id.value()))
            .count(&self.conn)
            .await
            .context("Failed to count user ads")
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn to_active_model(new: NewAd) -> ads::ActiveModel {
    let now = now_timestamp();

    ads::ActiveModel {
        company_id: Set(new.company_id.value()),
        user_id: Set(new.user_id.value()),
        event_name: Set(new.event_name),
        product_name: Set(new.product_name),
        product_categories: Set(to_json(&new.product_categories)),
        location: Set(new.location),
        headline: Set(new.headline),
        description: Set(new.description),
        slogan: Set(new.slogan),
        cta_text: Set(new.cta_text),
        keywords: Set(to_json(&new.keywords)),
        hashtags: Set(to_json(&new.hashtags)),
        image_prompt: Set(new.image_prompt),
        image_url: Set(None),
        platforms: Set(to_json(&new.platforms)),
        platform_details: Set(to_json(&new.platform_details)),
        recommended_posting_times: Set(to_json(&new.recommended_posting_times)),
        budget_allocation: Set(to_json(&new.budget_allocation)),
        status: Set(new.status.as_str().to_string()),
        ad_type: Set(new.ad_type.as_str().to_string()),
        evaluation_score: Set(None),
        evaluation_details: Set(None),
        regeneration_count: Set(new.regeneration_count),
        parent_ad_id: Set(new.parent_ad_id.map(|id| id.value())),
        raw_response: Set(new.raw_response),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        evaluated_at: Set(None),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AdFilter;
    use crate::db::repositories::fixtures::{new_ad, seeded_store};

    fn created(outcome: InsertOutcome) -> Ad {
        match outcome {
            InsertOutcome::Created(ad) => ad,
            InsertOutcome::QuotaExhausted => panic!("quota unexpectedly exhausted"),
        }
    }

    fn evaluation() -> NewEvaluation {
        NewEvaluation {
            relevance_score: 8.0,
            clarity_score: 7.0,
            persuasiveness_score: 6.0,
            brand_safety_score: 9.0,
            overall_score: 7.5,
            feedback: "Solid".to_string(),
            recommendations: vec![],
            evaluator_model: "test".to_string(),
            evaluation_prompt: "prompt".to_string(),
            details: serde_json::json!({"overall_score": 7.5}),
        }
    }

    #[tokio::test]
    async fn test_insert_counted_stops_at_limit() {
        let (store, company_id, user_id) = seeded_store(1).await;

        let first = store.insert_ad_counted(new_ad(company_id, user_id, None)).await.unwrap();
        assert!(matches!(first, InsertOutcome::Created(_)));

        // The counter now equals the limit, so the conditional update matches nothing
        let second = store.insert_ad_counted(new_ad(company_id, user_id, None)).await.unwrap();
        assert!(matches!(second, InsertOutcome::QuotaExhausted));

        assert_eq!(store.count_ads(&AdFilter::for_company(company_id)).await.unwrap(), 1);
        let company = store.get_company(company_id).await.unwrap().unwrap();
        assert_eq!(company.ads_generated_this_month, 1);
        assert_eq!(company.total_ads_generated, 1);
    }

    #[tokio::test]
    async fn test_lineage_returns_whole_tree_from_any_member() {
        let (store, company_id, user_id) = seeded_store(10).await;
        let db = &store;
        let insert = move |parent| db.insert_ad_counted(new_ad(company_id, user_id, parent));

        let root = created(insert(None).await.unwrap());
        let child = created(insert(Some(root.id)).await.unwrap());
        let grandchild = created(insert(Some(child.id)).await.unwrap());
        let sibling = created(insert(Some(root.id)).await.unwrap());
        let unrelated = created(insert(None).await.unwrap());

        let expected = vec![root.id, child.id, grandchild.id, sibling.id];
        for start in [root.id, grandchild.id, sibling.id] {
            let ids: Vec<AdId> = store
                .ad_lineage(start)
                .await
                .unwrap()
                .into_iter()
                .map(|ad| ad.id)
                .collect();
            assert_eq!(ids, expected);
        }

        let alone = store.ad_lineage(unrelated.id).await.unwrap();
        assert_eq!(alone.len(), 1);
        assert!(store.ad_lineage(AdId::new(9999)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_evaluations_and_detaches_children() {
        let (store, company_id, user_id) = seeded_store(10).await;
        let root = created(store.insert_ad_counted(new_ad(company_id, user_id, None)).await.unwrap());
        let middle = created(
            store
                .insert_ad_counted(new_ad(company_id, user_id, Some(root.id)))
                .await
                .unwrap(),
        );
        let leaf = created(
            store
                .insert_ad_counted(new_ad(company_id, user_id, Some(middle.id)))
                .await
                .unwrap(),
        );

        let (evaluated, _) = store.record_ad_evaluation(middle.id, evaluation()).await.unwrap();
        assert_eq!(evaluated.status, AdStatus::Evaluated);
        assert_eq!(store.get_ad_evaluations(middle.id).await.unwrap().len(), 1);

        assert!(store.delete_ad(middle.id).await.unwrap());

        assert!(store.get_ad(middle.id).await.unwrap().is_none());
        assert!(store.get_ad_evaluations(middle.id).await.unwrap().is_empty());

        let leaf = store.get_ad(leaf.id).await.unwrap().unwrap();
        assert_eq!(leaf.parent_ad_id, None);
        assert!(store.get_ad(root.id).await.unwrap().is_some());

        assert!(!store.delete_ad(middle.id).await.unwrap());
    }
}
