//! `SeaORM` implementation of the `AdminService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tracing::info;

use crate::db::{AdFilter, Store};
use crate::domain::{CompanyId, UserId};
use crate::models::{User, format_timestamp};
use crate::services::admin_service::{
    Activity, AdminDashboard, AdminError, AdminService, AdminUserView, CompanyDetail, CompanyList,
    CompanyListQuery, CompanyMember, CompanyRanking, CompanySummary, PlatformStatistics,
    StatisticsQuery, TopAd, TopCompany, UserList, UserListQuery,
};
use crate::services::analytics::{
    Period, daily_activity, day_start, month_start, parse_bound, platform_distribution, round2,
};
use crate::services::company_service::{EventCount, RecentAd};

const RECENT_ACTIVITIES: u64 = 10;
const TOP_COMPANIES: u64 = 5;
const DETAIL_RECENT_ADS: u64 = 10;
const STATISTICS_DAYS: i64 = 30;
const TOP_N: u64 = 10;

pub struct SeaOrmAdminService {
    store: Store,
    max_monthly_ad_limit: i32,
}

impl SeaOrmAdminService {
    #[must_use]
    pub const fn new(store: Store, max_monthly_ad_limit: i32) -> Self {
        Self {
            store,
            max_monthly_ad_limit,
        }
    }

    fn statistics_period(query: &StatisticsQuery) -> Result<Period, AdminError> {
        let parse = |raw: Option<&str>, end_of_day: bool| {
            raw.filter(|s| !s.trim().is_empty())
                .map(|s| {
                    parse_bound(s, end_of_day)
                        .ok_or_else(|| AdminError::Validation(format!("Invalid date: {s}")))
                })
                .transpose()
        };

        let end = parse(query.end_date.as_deref(), true)?.unwrap_or_else(Utc::now);
        let start = parse(query.start_date.as_deref(), false)?
            .unwrap_or_else(|| Period::last_days(end, STATISTICS_DAYS).start);

        Period::bounded(start, end).map_err(|e| AdminError::Validation(e.to_string()))
    }
}

#[async_trait]
impl AdminService for SeaOrmAdminService {
    async fn dashboard(&self) -> Result<AdminDashboard, AdminError> {
        let now = Utc::now();
        let everything = AdFilter::default();

        let total_companies = self.store.count_companies(false).await?;
        let active_companies = self.store.count_companies(true).await?;
        let total_users = self.store.count_live_users(None).await?;
        let total_ads_generated = self.store.count_ads(&everything).await?;
        let ads_generated_today = self
            .store
            .count_ads(&everything.clone().created_between(Some(format_timestamp(day_start(now))), None))
            .await?;
        let ads_generated_this_month = self
            .store
            .count_ads(&everything.clone().created_between(Some(format_timestamp(month_start(now))), None))
            .await?;
        let total_regenerations = self
            .store
            .count_ads(&AdFilter {
                has_parent: Some(true),
                ..AdFilter::default()
            })
            .await?;
        let average_evaluation_score = self
            .store
            .average_evaluation_score(&everything)
            .await?
            .map_or(0.0, round2);

        let recent = self.store.recent_ads(None, RECENT_ACTIVITIES).await?;
        let ranked = self.store.top_companies(&everything, TOP_COMPANIES).await?;

        let mut ids: Vec<i32> = recent.iter().map(|a| a.company_id.value()).collect();
        ids.extend(ranked.iter().map(|c| c.company_id.value()));
        let names = self.store.company_names(&ids).await?;
        let name_of = |id: CompanyId| names.get(&id.value()).cloned().unwrap_or_default();

        Ok(AdminDashboard {
            total_companies,
            active_companies,
            total_users,
            total_ads_generated,
            ads_generated_today,
            ads_generated_this_month,
            total_regenerations,
            average_evaluation_score,
            recent_activities: recent
                .into_iter()
                .map(|ad| Activity {
                    id: ad.id,
                    kind: "ad_created",
                    company: name_of(ad.company_id),
                    event: ad.event_name,
                    created_at: ad.created_at,
                })
                .collect(),
            top_companies: ranked
                .into_iter()
                .map(|c| TopCompany {
                    id: c.company_id,
                    name: name_of(c.company_id),
                    ads_generated: c.ad_count,
                })
                .collect(),
        })
    }

    async fn list_companies(&self, query: CompanyListQuery) -> Result<CompanyList, AdminError> {
        let (companies, total) = self
            .store
            .list_companies(
                query.search.as_deref(),
                query.is_active,
                query.page,
                query.per_page,
            )
            .await?;

        let ids: Vec<i32> = companies.iter().map(|c| c.id.value()).collect();
        let ad_counts = self.store.ad_counts_by_company(&ids).await?;
        let user_counts = self.store.user_counts_by_company(&ids).await?;

        let companies = companies
            .into_iter()
            .map(|c| CompanySummary {
                total_ads: ad_counts.get(&c.id.value()).copied().unwrap_or(0),
                total_users: user_counts.get(&c.id.value()).copied().unwrap_or(0),
                id: c.id,
                name: c.name,
                email: c.email,
                is_active: c.is_active,
                is_verified: c.is_verified,
                ads_this_month: c.ads_generated_this_month,
                monthly_limit: c.monthly_ad_limit,
                created_at: c.created_at,
            })
            .collect();

        Ok(CompanyList {
            total,
            page: query.page,
            per_page: query.per_page,
            companies,
        })
    }

    async fn company_detail(&self, id: CompanyId) -> Result<CompanyDetail, AdminError> {
        let company = self
            .store
            .get_company(id)
            .await?
            .ok_or_else(|| AdminError::NotFound("Company".to_string()))?;

        let users = self
            .store
            .list_company_users(id)
            .await?
            .into_iter()
            .map(CompanyMember::from)
            .collect();
        let recent_ads = self
            .store
            .recent_ads(Some(id), DETAIL_RECENT_ADS)
            .await?
            .into_iter()
            .map(RecentAd::from)
            .collect();

        Ok(CompanyDetail {
            company,
            users,
            recent_ads,
        })
    }

    async fn statistics(&self, query: StatisticsQuery) -> Result<PlatformStatistics, AdminError> {
        let period = Self::statistics_period(&query)?;
        let filter = AdFilter {
            company_id: query.company_id,
            ..AdFilter::default()
        }
        .created_between(Some(period.start_key()), Some(period.end_key()));

        let rows = self.store.ad_activity(&filter).await?;
        let total_ads = rows.len() as u64;
        let total_evaluations = rows.iter().filter(|r| r.evaluation_score.is_some()).count() as u64;
        let unique_companies = rows.iter().map(|r| r.company_id).collect::<HashSet<_>>().len() as u64;
        let active_users = rows.iter().map(|r| r.user_id).collect::<HashSet<_>>().len() as u64;

        let total_regenerations = self
            .store
            .count_ads(&AdFilter {
                has_parent: Some(true),
                ..filter.clone()
            })
            .await?;

        let event_distribution = self
            .store
            .top_events(&filter, TOP_N)
            .await?
            .into_iter()
            .map(|(event_name, count)| EventCount { event_name, count })
            .collect();

        let top_ads = self.store.top_scored_ads(&filter, TOP_N).await?;
        let rankings = self.store.top_companies(&filter, TOP_N).await?;

        let mut ids: Vec<i32> = top_ads.iter().map(|a| a.company_id.value()).collect();
        ids.extend(rankings.iter().map(|c| c.company_id.value()));
        let names = self.store.company_names(&ids).await?;
        let name_of = |id: CompanyId| names.get(&id.value()).cloned().unwrap_or_default();

        Ok(PlatformStatistics {
            period_start: period.start_key(),
            period_end: period.end_key(),
            total_ads,
            total_regenerations,
            total_evaluations,
            unique_companies,
            active_users,
            daily_stats: daily_activity(&rows, &period),
            platform_distribution: platform_distribution(&rows),
            event_distribution,
            top_performing_ads: top_ads
                .into_iter()
                .map(|ad| TopAd {
                    id: ad.id,
                    company: name_of(ad.company_id),
                    headline: ad.content.headline,
                    event: ad.event_name,
                    score: ad.evaluation_score,
                })
                .collect(),
            company_rankings: rankings
                .into_iter()
                .map(|c| CompanyRanking {
                    name: name_of(c.company_id),
                    ads_generated: c.ad_count,
                    average_score: c.average_score.map_or(0.0, round2),
                })
                .collect(),
        })
    }

    async fn set_company_active(&self, id: CompanyId, is_active: bool) -> Result<(), AdminError> {
        if !self.store.set_company_active(id, is_active).await? {
            return Err(AdminError::NotFound("Company".to_string()));
        }
        info!(event = "company_status_changed", company_id = %id, is_active);
        Ok(())
    }

    async fn set_company_limit(&self, id: CompanyId, limit: i32) -> Result<(), AdminError> {
        if !(0..=self.max_monthly_ad_limit).contains(&limit) {
            return Err(AdminError::Validation(format!(
                "monthly_limit must be between 0 and {}",
                self.max_monthly_ad_limit
            )));
        }

        if !self.store.set_company_monthly_limit(id, limit).await? {
            return Err(AdminError::NotFound("Company".to_string()));
        }
        info!(event = "company_limit_changed", company_id = %id, monthly_limit = limit);
        Ok(())
    }

    async fn list_users(&self, query: UserListQuery) -> Result<UserList, AdminError> {
        let (users, total) = self
            .store
            .list_users(query.search.as_deref(), query.page, query.per_page)
            .await?;

        let ids: Vec<i32> = users
            .iter()
            .filter_map(|u| u.company_id.map(|c| c.value()))
            .collect();
        let names = self.store.company_names(&ids).await?;

        let users = users
            .into_iter()
            .map(|u| AdminUserView {
                company: u.company_id.and_then(|c| names.get(&c.value()).cloned()),
                id: u.id,
                email: u.email,
                username: u.username,
                full_name: u.full_name,
                role: u.role,
                is_active: u.is_active,
                is_email_verified: u.is_email_verified,
                created_at: u.created_at,
                last_login: u.last_login,
            })
            .collect();

        Ok(UserList {
            total,
            page: query.page,
            per_page: query.per_page,
            users,
        })
    }

    async fn delete_user(&self, admin: &User, id: UserId) -> Result<(), AdminError> {
        if admin.id == id {
            return Err(AdminError::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }

        if self.store.get_user(id).await?.is_none() {
            return Err(AdminError::NotFound("User".to_string()));
        }

        let owned = self.store.count_user_ads(id).await?;
        if owned > 0 {
            return Err(AdminError::Conflict(format!(
                "User still owns {owned} ads"
            )));
        }

        self.store.hard_delete_user(id).await?;
        info!(event = "user_deleted", user_id = %id, admin_id = %admin.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_default_to_last_thirty_days() {
        let period = SeaOrmAdminService::statistics_period(&StatisticsQuery {
            end_date: Some("2026-03-31T00:00:00Z".into()),
            ..StatisticsQuery::default()
        })
        .unwrap();

        assert_eq!(period.start_key(), "2026-03-01T00:00:00.000000Z");
    }
}
