//! `SeaORM` implementation of the `CompanyService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::info;

use crate::db::{AdFilter, CompanyProfileUpdate, Store};
use crate::domain::{AdStatus, AdType, UserRole};
use crate::models::{Company, User, format_timestamp};
use crate::services::analytics::{
    Period, daily_activity, month_start, parse_bound, platform_distribution, round2,
    score_distribution,
};
use crate::services::company_service::{
    AdStatistics, CompanyDashboard, CompanyError, CompanyProfile, CompanyService, CompanyUsage,
    EvaluationStats, EventCount, RecentAd, RegenerationStats, UsageQuery,
};

const RECENT_ADS: u64 = 5;
const TOP_EVENTS: u64 = 10;

pub struct SeaOrmCompanyService {
    store: Store,
}

impl SeaOrmCompanyService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn company_for(&self, user: &User) -> Result<Company, CompanyError> {
        let denied = || CompanyError::Forbidden("Company access required".to_string());

        if user.role != UserRole::Company {
            return Err(denied());
        }
        let company_id = user.company_id.ok_or_else(denied)?;

        let company = self
            .store
            .get_company(company_id)
            .await?
            .ok_or_else(denied)?;

        if !company.is_active {
            return Err(CompanyError::Forbidden(
                "Company account is inactive".to_string(),
            ));
        }
        Ok(company)
    }
}

/// Resolves the requested window, defaulting to the current month.
fn usage_period(query: &UsageQuery) -> Result<Period, CompanyError> {
    let parse = |raw: &Option<String>, end_of_day: bool| {
        raw.as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                parse_bound(s, end_of_day)
                    .ok_or_else(|| CompanyError::Validation(format!("Invalid date: {s}")))
            })
            .transpose()
    };

    let end = parse(&query.end_date, true)?.unwrap_or_else(Utc::now);
    let start = parse(&query.start_date, false)?.unwrap_or_else(|| month_start(end));

    Period::bounded(start, end).map_err(|e| CompanyError::Validation(e.to_string()))
}

#[async_trait]
impl CompanyService for SeaOrmCompanyService {
    async fn dashboard(&self, user: &User) -> Result<CompanyDashboard, CompanyError> {
        let company = self.company_for(user).await?;
        let all = AdFilter::for_company(company.id);
        let this_month = all
            .clone()
            .created_between(Some(format_timestamp(month_start(Utc::now()))), None);

        let total_ads_generated = self.store.count_ads(&all).await?;
        let ads_generated_this_month = self.store.count_ads(&this_month).await?;
        let average_evaluation_score = self
            .store
            .average_evaluation_score(&all)
            .await?
            .map(round2);
        let recent_ads = self
            .store
            .recent_ads(Some(company.id), RECENT_ADS)
            .await?
            .into_iter()
            .map(RecentAd::from)
            .collect();

        Ok(CompanyDashboard {
            company_id: company.id,
            remaining_monthly_limit: company.remaining_monthly_limit(),
            company_name: company.name,
            total_ads_generated,
            ads_generated_this_month,
            monthly_limit: company.monthly_ad_limit,
            average_evaluation_score,
            recent_ads,
        })
    }

    async fn usage(&self, user: &User, query: UsageQuery) -> Result<CompanyUsage, CompanyError> {
        let company = self.company_for(user).await?;
        let period = usage_period(&query)?;

        let created = AdFilter::for_company(company.id)
            .created_between(Some(period.start_key()), Some(period.end_key()));

        let total_generated = self
            .store
            .count_ads(&AdFilter {
                ad_type: Some(AdType::ProductGen),
                ..created.clone()
            })
            .await?;
        let total_regenerated = self
            .store
            .count_ads(&AdFilter {
                ad_type: Some(AdType::Regen),
                ..created.clone()
            })
            .await?;
        let total_evaluated = self
            .store
            .count_ads(&AdFilter {
                evaluated_from: Some(period.start_key()),
                evaluated_to: Some(period.end_key()),
                ..AdFilter::for_company(company.id)
            })
            .await?;

        let rows = self.store.ad_activity(&created).await?;

        Ok(CompanyUsage {
            company_id: company.id,
            period_start: period.start_key(),
            period_end: period.end_key(),
            total_generated,
            total_regenerated,
            total_evaluated,
            daily_breakdown: daily_activity(&rows, &period),
            platform_distribution: platform_distribution(&rows),
            remaining_monthly_limit: company.remaining_monthly_limit(),
        })
    }

    async fn profile(&self, user: &User) -> Result<CompanyProfile, CompanyError> {
        Ok(self.company_for(user).await?.into())
    }

    async fn update_profile(
        &self,
        user: &User,
        update: CompanyProfileUpdate,
    ) -> Result<CompanyProfile, CompanyError> {
        let company = self.company_for(user).await?;

        let updated = self
            .store
            .update_company_profile(company.id, update)
            .await?
            .ok_or_else(|| CompanyError::Forbidden("Company account not found".to_string()))?;

        info!(event = "company_profile_updated", company_id = %company.id, user_id = %user.id);
        Ok(updated.into())
    }

    async fn ad_statistics(&self, user: &User) -> Result<AdStatistics, CompanyError> {
        let company = self.company_for(user).await?;
        let all = AdFilter::for_company(company.id);

        let total_ads = self.store.count_ads(&all).await?;

        let counts = self.store.ad_counts_by_status(&all).await?;
        let by_status: BTreeMap<&'static str, u64> = AdStatus::ALL
            .iter()
            .map(|s| (s.as_str(), counts.get(s.as_str()).copied().unwrap_or(0)))
            .collect();

        let by_event = self
            .store
            .top_events(&all, TOP_EVENTS)
            .await?
            .into_iter()
            .map(|(event_name, count)| EventCount { event_name, count })
            .collect();

        let total_regenerations = self
            .store
            .count_ads(&AdFilter {
                ad_type: Some(AdType::Regen),
                ..all.clone()
            })
            .await?;
        let average_regenerations_per_ad = round2(self.store.average_regeneration_count(&all).await?);

        let scores: Vec<f64> = self
            .store
            .ad_activity(&AdFilter {
                evaluated: Some(true),
                ..all.clone()
            })
            .await?
            .into_iter()
            .filter_map(|row| row.evaluation_score)
            .collect();
        let average_score = self.store.average_evaluation_score(&all).await?.map(round2);

        Ok(AdStatistics {
            total_ads,
            by_status,
            by_event,
            regeneration_stats: RegenerationStats {
                total_regenerations,
                average_regenerations_per_ad,
            },
            evaluation_stats: EvaluationStats {
                total_evaluated: scores.len() as u64,
                average_score,
                score_distribution: score_distribution(scores),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_period_defaults_to_month_of_end() {
        let period = usage_period(&UsageQuery {
            start_date: None,
            end_date: Some("2026-04-20".into()),
        })
        .unwrap();

        assert_eq!(period.start_key(), "2026-04-01T00:00:00.000000Z");
        assert_eq!(period.end_key(), "2026-04-20T23:59:59.999999Z");
    }

    #[test]
    fn test_usage_period_rejects_bad_input() {
        let bad = usage_period(&UsageQuery {
            start_date: Some("yesterday".into()),
            end_date: None,
        });
        assert!(matches!(bad, Err(CompanyError::Validation(_))));

        let reversed = usage_period(&UsageQuery {
            start_date: Some("2026-05-02".into()),
            end_date: Some("2026-05-01".into()),
        });
        assert!(matches!(reversed, Err(CompanyError::Validation(_))));

        let unbounded = usage_period(&UsageQuery {
            start_date: Some("0001-01-01".into()),
            end_date: Some("9999-12-31".into()),
        });
        assert!(matches!(unbounded, Err(CompanyError::Validation(_))));
    }
}
