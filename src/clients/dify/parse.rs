use serde::Serialize;
use serde_json::{Map, Value};

use super::GatewayError;
use crate::domain::Platform;

/// Ad copy produced by a generation or regeneration call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContentPayload {
    pub headline: String,
    pub description: String,
    pub slogan: String,
    pub cta_text: String,
    pub image_prompt: Option<String>,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub platforms: Vec<String>,
    pub platform_details: Map<String, Value>,
    pub posting_times: Vec<String>,
    pub budget_allocation: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvaluationPayload {
    pub relevance_score: f64,
    pub clarity_score: f64,
    pub persuasiveness_score: f64,
    pub brand_safety_score: f64,
    pub overall_score: f64,
    pub feedback: String,
    pub recommendations: Vec<String>,
}

const DEFAULT_SCORE: f64 = 5.0;
const MAX_SCORE: f64 = 10.0;

/// Cuts the outermost `{...}` out of a free-text answer and parses it.
pub fn extract_json_object(answer: &str) -> Result<Map<String, Value>, GatewayError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(GatewayError::ResponseFormat(
            "Empty answer from AI service".to_string(),
        ));
    }

    let (Some(start), Some(end)) = (answer.find('{'), answer.rfind('}')) else {
        return Err(GatewayError::ResponseFormat(
            "No JSON object found".to_string(),
        ));
    };
    if end < start {
        return Err(GatewayError::ResponseFormat(
            "No JSON object found".to_string(),
        ));
    }

    serde_json::from_str(&answer[start..=end])
        .map_err(|e| GatewayError::ResponseFormat(format!("Invalid JSON in answer: {e}")))
}

/// Parses ad copy, backfilling any required key the model left out.
pub fn parse_content(answer: &str) -> Result<ContentPayload, GatewayError> {
    let obj = extract_json_object(answer)?;

    Ok(ContentPayload {
        headline: text_or(&obj, "headline", "Special Offer"),
        description: text_or(&obj, "description", "Limited time offer"),
        slogan: text_or(&obj, "slogan", "Act Now"),
        cta_text: text_or(&obj, "cta_text", "Learn More"),
        image_prompt: optional_text(&obj, "image_prompt"),
        keywords: list_or(&obj, "keywords", &["sale", "offer", "limited"]),
        hashtags: list_or(&obj, "hashtags", &["#sale", "#offer"]),
        platforms: platforms(&obj),
        platform_details: object_or_empty(&obj, "platform_details"),
        posting_times: list_or(&obj, "posting_times", &[]),
        budget_allocation: object_or_empty(&obj, "budget_allocation"),
    })
}

/// Parses an evaluation; scores default to 5 and are clamped to 0..=10.
pub fn parse_evaluation(answer: &str) -> Result<EvaluationPayload, GatewayError> {
    let obj = extract_json_object(answer)?;

    Ok(EvaluationPayload {
        relevance_score: score(&obj, "relevance_score"),
        clarity_score: score(&obj, "clarity_score"),
        persuasiveness_score: score(&obj, "persuasiveness_score"),
        brand_safety_score: score(&obj, "brand_safety_score"),
        overall_score: score(&obj, "overall_score"),
        feedback: text_or(&obj, "feedback", "Evaluation completed"),
        recommendations: list_or(&obj, "recommendations", &[]),
    })
}

fn text_or(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

fn optional_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn list_or(obj: &Map<String, Value>, key: &str, default: &[&str]) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => default.iter().map(|s| (*s).to_string()).collect(),
    }
}

/// Known platforms in the order given, deduplicated. Falls back to Google
/// and Meta when nothing recognizable is left.
fn platforms(obj: &Map<String, Value>) -> Vec<String> {
    let mut known: Vec<Platform> = Vec::new();
    for raw in list_or(obj, "platforms", &[]) {
        if let Some(platform) = Platform::normalize(&raw)
            && !known.contains(&platform)
        {
            known.push(platform);
        }
    }

    if known.is_empty() {
        known = vec![Platform::GoogleAds, Platform::MetaAds];
    }
    known.iter().map(|p| p.as_str().to_string()).collect()
}

fn object_or_empty(obj: &Map<String, Value>, key: &str) -> Map<String, Value> {
    obj.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn score(obj: &Map<String, Value>, key: &str) -> f64 {
    let raw = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    raw.filter(|v| v.is_finite())
        .map_or(DEFAULT_SCORE, |v| v.clamp(0.0, MAX_SCORE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_json_wrapped_in_prose() {
        let answer = "Sure! Here is your ad:\n```json\n{\"headline\": \"Big Sale\"}\n```\nEnjoy.";
        let obj = extract_json_object(answer).unwrap();
        assert_eq!(obj["headline"], "Big Sale");
    }

    #[test]
    fn test_answer_without_braces_is_response_format_error() {
        let err = extract_json_object("I cannot help with that").unwrap_err();
        assert!(matches!(err, GatewayError::ResponseFormat(msg) if msg == "No JSON object found"));

        assert!(matches!(
            extract_json_object("   "),
            Err(GatewayError::ResponseFormat(_))
        ));
        assert!(matches!(
            extract_json_object("} backwards {"),
            Err(GatewayError::ResponseFormat(_))
        ));
        assert!(matches!(
            extract_json_object("{not json}"),
            Err(GatewayError::ResponseFormat(_))
        ));
    }

    #[test]
    fn test_platforms_are_normalized_against_known_set() {
        let content = parse_content(
            r#"{"platforms": ["Instagram", "Facebook", "meta_ads", "myspace", 3]}"#,
        )
        .unwrap();
        assert_eq!(content.platforms, vec!["instagram", "meta_ads"]);

        let content = parse_content(r#"{"platforms": ["myspace"]}"#).unwrap();
        assert_eq!(content.platforms, vec!["google_ads", "meta_ads"]);
    }

    #[test]
    fn test_content_backfills_missing_fields() {
        let content = parse_content(r#"{"headline": "Hello", "slogan": null}"#).unwrap();

        assert_eq!(content.headline, "Hello");
        assert_eq!(content.description, "Limited time offer");
        assert_eq!(content.slogan, "Act Now");
        assert_eq!(content.cta_text, "Learn More");
        assert_eq!(content.keywords, vec!["sale", "offer", "limited"]);
        assert_eq!(content.hashtags, vec!["#sale", "#offer"]);
        assert_eq!(content.platforms, vec!["google_ads", "meta_ads"]);
        assert_eq!(content.image_prompt, None);
        assert!(content.platform_details.is_empty());
        assert!(content.posting_times.is_empty());
        assert!(content.budget_allocation.is_empty());
    }

    #[test]
    fn test_content_keeps_provided_fields() {
        let answer = r##"{
            "headline": "Summer Splash",
            "description": "Cool deals",
            "slogan": "Dive in",
            "cta_text": "Shop",
            "image_prompt": "A pool party at sunset",
            "keywords": ["summer"],
            "hashtags": ["#summer"],
            "platforms": ["instagram"],
            "platform_details": {"instagram": {"priority": 1, "budget_percentage": 100}},
            "posting_times": ["9:00 AM"],
            "budget_allocation": {"instagram": 100}
        }"##;

        let content = parse_content(answer).unwrap();
        assert_eq!(content.image_prompt.as_deref(), Some("A pool party at sunset"));
        assert_eq!(content.platforms, vec!["instagram"]);
        assert_eq!(content.budget_allocation["instagram"], 100);
    }

    #[test]
    fn test_evaluation_scores_are_clamped() {
        let answer = r#"{
            "relevance_score": 15,
            "clarity_score": -3,
            "persuasiveness_score": "7.5",
            "brand_safety_score": "n/a",
            "feedback": "Solid"
        }"#;

        let eval = parse_evaluation(answer).unwrap();
        assert!((eval.relevance_score - 10.0).abs() < f64::EPSILON);
        assert!(eval.clarity_score.abs() < f64::EPSILON);
        assert!((eval.persuasiveness_score - 7.5).abs() < f64::EPSILON);
        assert!((eval.brand_safety_score - 5.0).abs() < f64::EPSILON);
        assert!((eval.overall_score - 5.0).abs() < f64::EPSILON);
        assert_eq!(eval.feedback, "Solid");
        assert!(eval.recommendations.is_empty());
    }
}
