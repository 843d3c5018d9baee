//! `SeaORM` implementation of the `AdService` trait.
//!
//! Generation is two sequential gateway calls: content first, then image.
//! The ad row and the quota increment commit together before the image
//! step, so a failed image never rolls back a paid-for generation.

use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::dify::{AdSnapshot, AiGateway, ContentPayload, ContentRequest, ImageContext};
use crate::db::{InsertOutcome, NewAd, NewEvaluation, Store};
use crate::domain::{AdId, AdStatus, AdType, CompanyId, UserId};
use crate::models::{Ad, Company, User};
use crate::services::ImageService;
use crate::services::ad_service::{
    AdError, AdListQuery, AdPage, AdResponse, AdService, EvaluationResult, GenerateAdRequest,
    GenerateImageRequest, ImageResult, RegenerateAdRequest,
};

const EVALUATOR_MODEL: &str = "dify";

pub struct SeaOrmAdService {
    store: Store,
    gateway: Arc<dyn AiGateway>,
    images: ImageService,
}

impl SeaOrmAdService {
    #[must_use]
    pub fn new(store: Store, gateway: Arc<dyn AiGateway>, images: ImageService) -> Self {
        Self {
            store,
            gateway,
            images,
        }
    }

    /// The caller's company, which must exist and be active.
    async fn active_company(&self, user: &User) -> Result<Company, AdError> {
        let company_id = user
            .company_id
            .ok_or_else(|| AdError::Forbidden("Ads require a company account".to_string()))?;

        let company = self
            .store
            .get_company(company_id)
            .await?
            .ok_or_else(|| AdError::Forbidden("Company account not found".to_string()))?;

        if !company.is_active {
            return Err(AdError::Forbidden("Company account is inactive".to_string()));
        }
        Ok(company)
    }

    /// Loads an ad the caller's company owns: 404 when missing, 403 otherwise.
    async fn owned_ad(&self, user: &User, ad_id: AdId) -> Result<Ad, AdError> {
        let ad = self
            .store
            .get_ad(ad_id)
            .await?
            .ok_or(AdError::NotFound(ad_id))?;

        if user.company_id != Some(ad.company_id) {
            return Err(AdError::Forbidden(
                "You don't have permission to access this ad".to_string(),
            ));
        }
        Ok(ad)
    }

    async fn company_name(&self, company_id: CompanyId) -> Result<String, AdError> {
        Ok(self
            .store
            .get_company(company_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_default())
    }

    /// Inserts a counted ad, mapping a lost quota race to `QuotaExceeded`.
    async fn insert_counted(&self, new: NewAd, limit: i32) -> Result<Ad, AdError> {
        let ad_type = new.ad_type;
        match self.store.insert_ad_counted(new).await? {
            InsertOutcome::Created(ad) => {
                metrics::counter!("ads_generated_total", "ad_type" => ad_type.as_str())
                    .increment(1);
                Ok(ad)
            }
            InsertOutcome::QuotaExhausted => Err(AdError::QuotaExceeded { limit }),
        }
    }

    /// Best-effort image step after creation. Failures are logged and the
    /// ad is returned without an image.
    async fn attach_image(&self, mut ad: Ad) -> Ad {
        let Some(prompt) = ad.content.image_prompt.clone() else {
            return ad;
        };

        match self.render_image(&ad, &prompt).await {
            Ok(public_url) => match self.store.set_ad_image_url(ad.id, &public_url).await {
                Ok(()) => ad.content.image_url = Some(public_url),
                Err(e) => warn!(ad_id = %ad.id, error = %e, "Failed to record ad image"),
            },
            Err(e) => warn!(ad_id = %ad.id, error = %e, "Image generation skipped"),
        }
        ad
    }

    /// Asks the gateway for an image and stores it locally.
    async fn render_image(&self, ad: &Ad, prompt: &str) -> Result<String, AdError> {
        let context = ImageContext {
            event_name: Some(ad.event_name.clone()),
            product_categories: ad.product_categories.clone(),
            headline: Some(ad.content.headline.clone()),
        };

        let source = self
            .gateway
            .generate_image(prompt, Some(&context))
            .await?
            .ok_or_else(|| AdError::ExternalService("AI service returned no image".to_string()))?;

        self.images
            .save_ad_image(&source, ad.id)
            .await
            .map_err(|e| AdError::ExternalService(format!("Image download failed: {e}")))
    }

    /// Image-only regeneration. Nothing is written unless a new image was
    /// downloaded successfully.
    async fn regenerate_image_in_place(
        &self,
        ad: &Ad,
        company_name: &str,
        extra_instructions: Option<&str>,
    ) -> Result<Ad, AdError> {
        let prompt = match (&ad.content.image_prompt, extra_instructions) {
            (Some(stored), None) => stored.clone(),
            (stored, extra) => {
                let snapshot = snapshot(ad, company_name);
                let generation = self
                    .gateway
                    .regenerate_content(&snapshot, true, extra)
                    .await?;
                generation
                    .content
                    .image_prompt
                    .or_else(|| stored.clone())
                    .ok_or_else(|| {
                        AdError::ResponseFormat("AI response did not include an image prompt".to_string())
                    })?
            }
        };

        let public_url = self.render_image(ad, &prompt).await?;
        let updated = self
            .store
            .apply_regenerated_image(ad.id, Some(prompt), &public_url)
            .await?;

        info!(event = "ad_image_regenerated", ad_id = %ad.id, regeneration_count = updated.regeneration_count);
        Ok(updated)
    }

    async fn regenerate_full(
        &self,
        user: &User,
        original: &Ad,
        extra_instructions: Option<&str>,
    ) -> Result<Ad, AdError> {
        let company = self.active_company(user).await?;
        if !company.has_quota() {
            return Err(AdError::QuotaExceeded {
                limit: company.monthly_ad_limit,
            });
        }

        let generation = self
            .gateway
            .regenerate_content(&snapshot(original, &company.name), false, extra_instructions)
            .await?;

        let new = new_ad(
            NewAdSource {
                company_id: company.id,
                user_id: user.id,
                event_name: original.event_name.clone(),
                product_name: original.product_name.clone(),
                product_categories: original.product_categories.clone(),
                location: original.location.clone(),
            },
            generation.content,
            generation.raw_answer,
        );
        let new = NewAd {
            status: AdStatus::Regenerated,
            ad_type: AdType::Regen,
            regeneration_count: original.regeneration_count + 1,
            parent_ad_id: Some(original.id),
            ..new
        };

        let ad = self.insert_counted(new, company.monthly_ad_limit).await?;
        info!(
            event = "ad_regenerated",
            ad_id = %ad.id,
            parent_ad_id = %original.id,
            regeneration_count = ad.regeneration_count
        );

        Ok(self.attach_image(ad).await)
    }
}

struct NewAdSource {
    company_id: CompanyId,
    user_id: UserId,
    event_name: String,
    product_name: Option<String>,
    product_categories: Vec<String>,
    location: Option<String>,
}

fn new_ad(source: NewAdSource, content: ContentPayload, raw_answer: String) -> NewAd {
    NewAd {
        company_id: source.company_id,
        user_id: source.user_id,
        event_name: source.event_name,
        product_name: source.product_name,
        product_categories: source.product_categories,
        location: source.location,
        headline: content.headline,
        description: content.description,
        slogan: content.slogan,
        cta_text: content.cta_text,
        keywords: content.keywords,
        hashtags: content.hashtags,
        image_prompt: content.image_prompt,
        platforms: content.platforms,
        platform_details: content.platform_details,
        recommended_posting_times: content.posting_times,
        budget_allocation: content.budget_allocation,
        status: AdStatus::Generated,
        ad_type: AdType::ProductGen,
        regeneration_count: 0,
        parent_ad_id: None,
        raw_response: Some(raw_answer),
    }
}

fn snapshot(ad: &Ad, company_name: &str) -> AdSnapshot {
    AdSnapshot {
        ad_id: ad.id.value(),
        event_name: ad.event_name.clone(),
        company_name: company_name.to_string(),
        product_categories: ad.product_categories.clone(),
        headline: ad.content.headline.clone(),
        description: ad.content.description.clone(),
        slogan: ad.content.slogan.clone(),
        cta_text: ad.content.cta_text.clone(),
        keywords: ad.content.keywords.clone(),
        hashtags: ad.content.hashtags.clone(),
    }
}

fn respond(ad: Ad, company_name: &str) -> AdResponse {
    AdResponse {
        ad,
        company_name: company_name.to_string(),
    }
}

#[async_trait::async_trait]
impl AdService for SeaOrmAdService {
    async fn generate_ad(
        &self,
        user: &User,
        request: GenerateAdRequest,
    ) -> Result<AdResponse, AdError> {
        let company = self.active_company(user).await?;
        if !company.has_quota() {
            return Err(AdError::QuotaExceeded {
                limit: company.monthly_ad_limit,
            });
        }

        let content_request = ContentRequest {
            event_name: request.event_name.clone(),
            company_name: request
                .company_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| company.name.clone()),
            location: request.location.clone(),
            product_categories: request.product_categories.clone(),
            product_name: request.product_name.clone(),
        };
        let generation = self.gateway.generate_content(&content_request).await?;

        let new = new_ad(
            NewAdSource {
                company_id: company.id,
                user_id: user.id,
                event_name: request.event_name,
                product_name: request.product_name,
                product_categories: request.product_categories,
                location: request.location,
            },
            generation.content,
            generation.raw_answer,
        );

        let ad = self.insert_counted(new, company.monthly_ad_limit).await?;
        info!(event = "ad_generated", ad_id = %ad.id, company_id = %company.id, user_id = %user.id);

        let ad = self.attach_image(ad).await;
        Ok(respond(ad, &company.name))
    }

    async fn regenerate_ad(
        &self,
        user: &User,
        request: RegenerateAdRequest,
    ) -> Result<AdResponse, AdError> {
        let original = self.owned_ad(user, request.ad_id).await?;
        let company_name = self.company_name(original.company_id).await?;
        let extra = request
            .additional_instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let ad = if request.regenerate_image {
            self.regenerate_image_in_place(&original, &company_name, extra)
                .await?
        } else {
            self.regenerate_full(user, &original, extra).await?
        };

        Ok(respond(ad, &company_name))
    }

    async fn generate_image(
        &self,
        user: &User,
        request: GenerateImageRequest,
    ) -> Result<ImageResult, AdError> {
        let ad = self.owned_ad(user, request.ad_id).await?;

        if let Some(image_url) = ad.content.image_url.clone()
            && !request.force_regenerate
        {
            return Ok(ImageResult {
                ad_id: ad.id,
                image_url,
                image_prompt: ad.content.image_prompt.unwrap_or_default(),
                generated_at: ad.updated_at,
            });
        }

        let company_name = self.company_name(ad.company_id).await?;
        let updated = self
            .regenerate_image_in_place(&ad, &company_name, None)
            .await?;

        Ok(ImageResult {
            ad_id: updated.id,
            image_url: updated.content.image_url.unwrap_or_default(),
            image_prompt: updated.content.image_prompt.unwrap_or_default(),
            generated_at: updated.updated_at,
        })
    }

    async fn evaluate_ad(&self, user: &User, ad_id: AdId) -> Result<EvaluationResult, AdError> {
        let ad = self.owned_ad(user, ad_id).await?;
        let company_name = self.company_name(ad.company_id).await?;
        let snapshot = snapshot(&ad, &company_name);

        let payload = self.gateway.evaluate_content(&snapshot).await?;

        let evaluation = NewEvaluation {
            relevance_score: payload.relevance_score,
            clarity_score: payload.clarity_score,
            persuasiveness_score: payload.persuasiveness_score,
            brand_safety_score: payload.brand_safety_score,
            overall_score: payload.overall_score,
            feedback: payload.feedback.clone(),
            recommendations: payload.recommendations.clone(),
            evaluator_model: EVALUATOR_MODEL.to_string(),
            evaluation_prompt: serde_json::to_string(&snapshot).unwrap_or_default(),
            details: serde_json::to_value(&payload).unwrap_or_default(),
        };

        let (ad, stored) = self.store.record_ad_evaluation(ad.id, evaluation).await?;
        info!(event = "ad_evaluated", ad_id = %ad.id, overall_score = stored.overall_score);

        Ok(EvaluationResult {
            ad_id: ad.id,
            relevance_score: stored.relevance_score,
            clarity_score: stored.clarity_score,
            persuasiveness_score: stored.persuasiveness_score,
            brand_safety_score: stored.brand_safety_score,
            overall_score: stored.overall_score,
            feedback: stored.feedback,
            recommendations: stored.recommendations,
            evaluated_at: ad.evaluated_at.unwrap_or(stored.created_at),
        })
    }

    async fn list_company_ads(&self, user: &User, query: AdListQuery) -> Result<AdPage, AdError> {
        let company_id = user
            .company_id
            .ok_or_else(|| AdError::Forbidden("Ads require a company account".to_string()))?;

        let (ads, total) = self
            .store
            .list_company_ads(company_id, query.status, query.page, query.per_page)
            .await?;
        let company_name = self.company_name(company_id).await?;

        Ok(AdPage {
            total,
            page: query.page,
            per_page: query.per_page,
            ads: ads.into_iter().map(|ad| respond(ad, &company_name)).collect(),
        })
    }

    async fn get_ad(&self, user: &User, ad_id: AdId) -> Result<AdResponse, AdError> {
        let ad = self.owned_ad(user, ad_id).await?;
        let company_name = self.company_name(ad.company_id).await?;
        Ok(respond(ad, &company_name))
    }

    async fn ad_history(&self, user: &User, ad_id: AdId) -> Result<Vec<AdResponse>, AdError> {
        let ad = self.owned_ad(user, ad_id).await?;
        let company_name = self.company_name(ad.company_id).await?;

        let lineage = self.store.ad_lineage(ad.id).await?;
        Ok(lineage
            .into_iter()
            .filter(|a| a.company_id == ad.company_id)
            .map(|a| respond(a, &company_name))
            .collect())
    }

    async fn delete_ad(&self, user: &User, ad_id: AdId) -> Result<(), AdError> {
        let ad = self.owned_ad(user, ad_id).await?;

        if !self.store.delete_ad(ad.id).await? {
            return Err(AdError::NotFound(ad.id));
        }
        self.images.spawn_delete_ad_images(ad.id);

        info!(event = "ad_deleted", ad_id = %ad.id, user_id = %user.id);
        Ok(())
    }
}
