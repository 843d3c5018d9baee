use serde::Serialize;

/// Inputs for a fresh generation.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub event_name: String,
    pub company_name: String,
    pub location: Option<String>,
    pub product_categories: Vec<String>,
    pub product_name: Option<String>,
}

/// Extra context folded into the image prompt.
#[derive(Debug, Clone, Default)]
pub struct ImageContext {
    pub event_name: Option<String>,
    pub product_categories: Vec<String>,
    pub headline: Option<String>,
}

/// The parts of an existing ad the model needs to regenerate or judge it.
///
/// Serialized as-is into the stored evaluation prompt.
#[derive(Debug, Clone, Serialize)]
pub struct AdSnapshot {
    pub ad_id: i32,
    pub event_name: String,
    pub company_name: String,
    pub product_categories: Vec<String>,
    pub headline: String,
    pub description: String,
    pub slogan: String,
    pub cta_text: String,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
}

const IMAGE_STYLE: &str = "Style: Professional advertising, high-quality, modern, engaging";

#[must_use]
pub fn generation_prompt(req: &ContentRequest) -> String {
    format!(
        r##"Generate an advertising campaign for the following:

Event: {event}
Company: {company}
Location: {location}
Product Categories: {categories}
Product Name: {product}

Please respond with ONLY a valid JSON object (no additional text before or after) in this exact format:
{{
    "headline": "Catchy headline (max 60 characters)",
    "description": "Compelling description (max 150 characters)",
    "slogan": "Memorable slogan",
    "cta_text": "Call to action",
    "image_prompt": "Detailed image generation prompt describing the visual for this ad",
    "keywords": ["keyword1", "keyword2", "keyword3", "keyword4", "keyword5"],
    "hashtags": ["#hashtag1", "#hashtag2", "#hashtag3", "#hashtag4", "#hashtag5"],
    "platforms": ["google_ads", "meta_ads", "linkedin", "instagram", "tiktok"],
    "platform_details": {{
        "google_ads": {{"priority": 1, "budget_percentage": 40}},
        "meta_ads": {{"priority": 2, "budget_percentage": 30}},
        "linkedin": {{"priority": 3, "budget_percentage": 15}},
        "instagram": {{"priority": 4, "budget_percentage": 10}},
        "tiktok": {{"priority": 5, "budget_percentage": 5}}
    }},
    "posting_times": ["9:00 AM", "2:00 PM", "6:00 PM"],
    "budget_allocation": {{"google_ads": 40, "meta_ads": 30, "linkedin": 15, "instagram": 10, "tiktok": 5}}
}}

Make the content specific to the event, engaging, and optimized for conversions. Use only valid JSON format."##,
        event = req.event_name,
        company = req.company_name,
        location = req.location.as_deref().unwrap_or("Global"),
        categories = req.product_categories.join(", "),
        product = req.product_name.as_deref().unwrap_or("General Products"),
    )
}

/// Appends the context line and style hint when any context is present.
#[must_use]
pub fn enrich_image_prompt(base: &str, context: Option<&ImageContext>) -> String {
    let Some(ctx) = context else {
        return base.to_string();
    };

    let mut parts = Vec::new();
    if let Some(event) = ctx.event_name.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("Event: {event}"));
    }
    if !ctx.product_categories.is_empty() {
        parts.push(format!("Products: {}", ctx.product_categories.join(", ")));
    }
    if let Some(headline) = ctx.headline.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("Theme: {headline}"));
    }

    if parts.is_empty() {
        base.to_string()
    } else {
        format!("{base}\n\nContext: {}\n\n{IMAGE_STYLE}", parts.join(" | "))
    }
}

#[must_use]
pub fn image_prompt(enriched: &str) -> String {
    format!(
        "Generate a high-quality advertising image based on this description:

{enriched}

Requirements:
- Professional advertising quality
- High resolution (1024x1024 or higher)
- Eye-catching and relevant to the description
- Brand-safe content
- Modern design aesthetic

Return the image URL or upload the image."
    )
}

#[must_use]
pub fn regeneration_prompt(
    original: &AdSnapshot,
    image_only: bool,
    extra_instructions: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Regenerate an improved version of this advertisement:

Event: {}
Company: {}
Product Categories: {}

Original Content:
Headline: {}
Description: {}
Slogan: {}
",
        original.event_name,
        original.company_name,
        original.product_categories.join(", "),
        original.headline,
        original.description,
        original.slogan,
    );

    if image_only {
        prompt.push_str(
            r#"

Generate ONLY a new image prompt. Respond with valid JSON:
{
    "image_prompt": "New detailed image generation prompt"
}
"#,
        );
    } else {
        prompt.push_str(
            r##"

Generate completely new ad content while maintaining the same event theme. Respond with ONLY a valid JSON object in this exact format:
{
    "headline": "New catchy headline",
    "description": "New compelling description",
    "slogan": "New memorable slogan",
    "cta_text": "Call to action",
    "image_prompt": "Detailed image prompt",
    "keywords": ["keyword1", "keyword2", "keyword3", "keyword4", "keyword5"],
    "hashtags": ["#hashtag1", "#hashtag2", "#hashtag3", "#hashtag4", "#hashtag5"],
    "platforms": ["google_ads", "meta_ads", "linkedin"],
    "platform_details": {
        "google_ads": {"priority": 1, "budget_percentage": 50},
        "meta_ads": {"priority": 2, "budget_percentage": 35},
        "linkedin": {"priority": 3, "budget_percentage": 15}
    },
    "posting_times": ["9:00 AM", "2:00 PM", "6:00 PM"],
    "budget_allocation": {"google_ads": 50, "meta_ads": 35, "linkedin": 15}
}
"##,
        );
    }

    if let Some(extra) = extra_instructions.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\nAdditional Instructions: ");
        prompt.push_str(extra);
    }

    prompt
}

#[must_use]
pub fn evaluation_prompt(ad: &AdSnapshot) -> String {
    format!(
        r#"Evaluate this advertisement:

Event: {}
Company: {}
Product Categories: {}

Ad Content:
Headline: {}
Description: {}
Slogan: {}
CTA: {}
Keywords: {}
Hashtags: {}

Respond with ONLY a valid JSON object (no additional text) in this exact format:
{{
    "relevance_score": 8.5,
    "clarity_score": 9.0,
    "persuasiveness_score": 8.0,
    "brand_safety_score": 9.5,
    "overall_score": 8.75,
    "feedback": "Detailed feedback text explaining the scores",
    "recommendations": ["recommendation 1", "recommendation 2", "recommendation 3"]
}}

Scores should be between 0-10. Consider event relevance, message clarity, persuasiveness, and brand safety."#,
        ad.event_name,
        ad.company_name,
        ad.product_categories.join(", "),
        ad.headline,
        ad.description,
        ad.slogan,
        ad.cta_text,
        ad.keywords.join(", "),
        ad.hashtags.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> AdSnapshot {
        AdSnapshot {
            ad_id: 7,
            event_name: "Black Friday".to_string(),
            company_name: "Acme".to_string(),
            product_categories: vec!["shoes".to_string(), "bags".to_string()],
            headline: "Huge Deals".to_string(),
            description: "Everything must go".to_string(),
            slogan: "Shop now".to_string(),
            cta_text: "Buy".to_string(),
            keywords: vec!["deal".to_string()],
            hashtags: vec!["#bf".to_string()],
        }
    }

    #[test]
    fn test_generation_prompt_defaults() {
        let prompt = generation_prompt(&ContentRequest {
            event_name: "Spring Fair".to_string(),
            company_name: "Acme".to_string(),
            location: None,
            product_categories: vec!["garden".to_string(), "tools".to_string()],
            product_name: None,
        });

        assert!(prompt.contains("Location: Global"));
        assert!(prompt.contains("Product Name: General Products"));
        assert!(prompt.contains("Product Categories: garden, tools"));
        assert!(prompt.contains(r#""tiktok": {"priority": 5, "budget_percentage": 5}"#));
        assert!(prompt.contains(r##""hashtags": ["#hashtag1", "#hashtag2", "#hashtag3", "#hashtag4", "#hashtag5"]"##));
        assert!(prompt.ends_with("Use only valid JSON format."));
    }

    #[test]
    fn test_image_prompt_enrichment() {
        assert_eq!(enrich_image_prompt("A red shoe", None), "A red shoe");
        assert_eq!(
            enrich_image_prompt("A red shoe", Some(&ImageContext::default())),
            "A red shoe"
        );

        let ctx = ImageContext {
            event_name: Some("Black Friday".to_string()),
            product_categories: vec!["shoes".to_string()],
            headline: Some("Huge Deals".to_string()),
        };
        let enriched = enrich_image_prompt("A red shoe", Some(&ctx));
        assert!(enriched.contains("Context: Event: Black Friday | Products: shoes | Theme: Huge Deals"));
        assert!(enriched.ends_with(IMAGE_STYLE));
    }

    #[test]
    fn test_regeneration_prompt_modes() {
        let full = regeneration_prompt(&snapshot(), false, Some("Make it playful"));
        assert!(full.contains("Headline: Huge Deals"));
        assert!(full.contains(r#""google_ads": 50"#));
        assert!(full.contains(r##""#hashtag5"]"##));
        assert!(full.contains(r#""posting_times": ["9:00 AM", "2:00 PM", "6:00 PM"]"#));
        assert!(full.ends_with("Additional Instructions: Make it playful"));

        let image = regeneration_prompt(&snapshot(), true, None);
        assert!(image.contains("Generate ONLY a new image prompt"));
        assert!(!image.contains("Additional Instructions"));
    }

    #[test]
    fn test_evaluation_prompt_lists_fields() {
        let prompt = evaluation_prompt(&snapshot());
        assert!(prompt.contains("CTA: Buy"));
        assert!(prompt.contains("Product Categories: shoes, bags"));
        assert!(prompt.contains("Hashtags: #bf"));
    }
}
