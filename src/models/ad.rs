use serde::Serialize;
use serde_json::{Map, Value};

use super::{parse_json_list, parse_json_object};
use crate::domain::{AdId, AdStatus, AdType, CompanyId, UserId};
use crate::entities::{ad_evaluations, ads};

/// Generated copy and image reference of an ad.
#[derive(Debug, Clone, Serialize)]
pub struct AdContent {
    pub headline: String,
    pub description: String,
    pub slogan: String,
    pub cta_text: String,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub image_prompt: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ad {
    pub id: AdId,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub event_name: String,
    pub product_name: Option<String>,
    pub product_categories: Vec<String>,
    pub location: Option<String>,
    pub content: AdContent,
    pub platforms: Vec<String>,
    pub platform_details: Map<String, Value>,
    pub recommended_posting_times: Vec<String>,
    pub budget_allocation: Map<String, Value>,
    pub status: AdStatus,
    pub ad_type: AdType,
    pub evaluation_score: Option<f64>,
    pub evaluation_details: Option<Value>,
    pub regeneration_count: i32,
    pub parent_ad_id: Option<AdId>,
    pub created_at: String,
    pub updated_at: String,
    pub evaluated_at: Option<String>,
}

impl From<ads::Model> for Ad {
    fn from(model: ads::Model) -> Self {
        Self {
            id: AdId::new(model.id),
            company_id: CompanyId::new(model.company_id),
            user_id: UserId::new(model.user_id),
            event_name: model.event_name,
            product_name: model.product_name,
            product_categories: parse_json_list(&model.product_categories),
            location: model.location,
            content: AdContent {
                headline: model.headline,
                description: model.description,
                slogan: model.slogan,
                cta_text: model.cta_text,
                keywords: parse_json_list(&model.keywords),
                hashtags: parse_json_list(&model.hashtags),
                image_prompt: model.image_prompt,
                image_url: model.image_url,
            },
            platforms: parse_json_list(&model.platforms),
            platform_details: parse_json_object(&model.platform_details),
            recommended_posting_times: parse_json_list(&model.recommended_posting_times),
            budget_allocation: parse_json_object(&model.budget_allocation),
            status: model.status.parse().unwrap_or(AdStatus::Draft),
            ad_type: model.ad_type.parse().unwrap_or(AdType::ProductGen),
            evaluation_score: model.evaluation_score,
            evaluation_details: model
                .evaluation_details
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            regeneration_count: model.regeneration_count,
            parent_ad_id: model.parent_ad_id.map(AdId::new),
            created_at: model.created_at,
            updated_at: model.updated_at,
            evaluated_at: model.evaluated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdEvaluation {
    pub id: i32,
    pub ad_id: AdId,
    pub relevance_score: f64,
    pub clarity_score: f64,
    pub persuasiveness_score: f64,
    pub brand_safety_score: f64,
    pub overall_score: f64,
    pub feedback: String,
    pub recommendations: Vec<String>,
    pub evaluator_model: String,
    pub created_at: String,
}

impl From<ad_evaluations::Model> for AdEvaluation {
    fn from(model: ad_evaluations::Model) -> Self {
        Self {
            id: model.id,
            ad_id: AdId::new(model.ad_id),
            relevance_score: model.relevance_score,
            clarity_score: model.clarity_score,
            persuasiveness_score: model.persuasiveness_score,
            brand_safety_score: model.brand_safety_score,
            overall_score: model.overall_score,
            feedback: model.feedback,
            recommendations: parse_json_list(&model.recommendations),
            evaluator_model: model.evaluator_model,
            created_at: model.created_at,
        }
    }
}
