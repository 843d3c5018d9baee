use serde::Serialize;

use crate::domain::CompanyId;
use crate::entities::companies;

#[derive(Debug, Clone, Serialize)]
pub struct Company {
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
    pub monthly_ad_limit: i32,
    pub ads_generated_this_month: i32,
    pub total_ads_generated: i32,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Company {
    #[must_use]
    pub const fn has_quota(&self) -> bool {
        self.ads_generated_this_month < self.monthly_ad_limit
    }

    #[must_use]
    pub fn remaining_monthly_limit(&self) -> i32 {
        (self.monthly_ad_limit - self.ads_generated_this_month).max(0)
    }
}

impl From<companies::Model> for Company {
    fn from(model: companies::Model) -> Self {
        Self {
            id: CompanyId::new(model.id),
            name: model.name,
            email: model.email,
            phone: model.phone,
            website: model.website,
            address: model.address,
            city: model.city,
            country: model.country,
            industry: model.industry,
            size: model.size,
            description: model.description,
            monthly_ad_limit: model.monthly_ad_limit,
            ads_generated_this_month: model.ads_generated_this_month,
            total_ads_generated: model.total_ads_generated,
            is_active: model.is_active,
            is_verified: model.is_verified,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
