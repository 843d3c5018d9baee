pub mod ad;
pub mod company;
pub mod stats;
pub mod user;

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::Map;

    use super::ad::NewAd;
    use super::company::NewCompany;
    use super::user::NewUser;
    use crate::config::SecurityConfig;
    use crate::db::Store;
    use crate::domain::{AdId, AdStatus, AdType, CompanyId, UserId, UserRole};

    /// In-memory store with one company (`monthly_limit`) and one member.
    pub async fn seeded_store(monthly_limit: i32) -> (Store, CompanyId, UserId) {
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };
        let store = Store::with_pool_options("sqlite::memory:", 1, 1, security)
            .await
            .unwrap();

        let company = store
            .create_company(NewCompany {
                name: "Acme".to_string(),
                email: None,
                monthly_ad_limit: monthly_limit,
            })
            .await
            .unwrap();
        let user = store
            .create_user(NewUser {
                email: "ana@example.com".to_string(),
                username: "ana".to_string(),
                password: "Str0ng!pass".to_string(),
                full_name: None,
                phone: None,
                role: UserRole::Company,
                company_id: Some(company.id),
                is_email_verified: true,
            })
            .await
            .unwrap();

        (store, company.id, user.id)
    }

    pub fn new_ad(company_id: CompanyId, user_id: UserId, parent: Option<AdId>) -> NewAd {
        NewAd {
            company_id,
            user_id,
            event_name: "Summer Sale".to_string(),
            product_name: None,
            product_categories: vec!["shoes".to_string()],
            location: None,
            headline: "Hot deals".to_string(),
            description: "Everything must go".to_string(),
            slogan: "Act now".to_string(),
            cta_text: "Shop".to_string(),
            keywords: vec!["sale".to_string()],
            hashtags: vec!["#sale".to_string()],
            image_prompt: None,
            platforms: vec!["google_ads".to_string()],
            platform_details: Map::new(),
            recommended_posting_times: vec![],
            budget_allocation: Map::new(),
            status: if parent.is_some() {
                AdStatus::Regenerated
            } else {
                AdStatus::Generated
            },
            ad_type: if parent.is_some() {
                AdType::Regen
            } else {
                AdType::ProductGen
            },
            regeneration_count: i32::from(parent.is_some()),
            parent_ad_id: parent,
            raw_response: None,
        }
    }
}
