//! Client for a Dify-style `chat-messages` endpoint.
//!
//! Every operation is a single blocking-mode chat call whose free-text
//! `answer` is mined for JSON (content, evaluation) or an image reference.

pub mod image_url;
pub mod parse;
pub mod prompts;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AiConfig;

pub use parse::{ContentPayload, EvaluationPayload};
pub use prompts::{AdSnapshot, ContentRequest, ImageContext};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure, timeout or non-2xx status.
    #[error("AI service error: {0}")]
    ExternalService(String),

    /// The service answered but the answer could not be interpreted.
    #[error("AI response format error: {0}")]
    ResponseFormat(String),
}

/// Parsed content plus the untouched answer text for auditing.
#[derive(Debug, Clone)]
pub struct Generation {
    pub content: ContentPayload,
    pub raw_answer: String,
}

/// Operations the ad services need from the generative backend.
#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn generate_content(&self, request: &ContentRequest) -> Result<Generation, GatewayError>;

    /// Returns `Ok(None)` when the reply contained no usable image reference.
    async fn generate_image(
        &self,
        image_prompt: &str,
        context: Option<&ImageContext>,
    ) -> Result<Option<String>, GatewayError>;

    async fn regenerate_content(
        &self,
        original: &AdSnapshot,
        image_only: bool,
        extra_instructions: Option<&str>,
    ) -> Result<Generation, GatewayError>;

    async fn evaluate_content(&self, ad: &AdSnapshot) -> Result<EvaluationPayload, GatewayError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    inputs: serde_json::Map<String, Value>,
    query: &'a str,
    response_mode: &'static str,
    user: &'a str,
}

#[derive(Clone)]
pub struct DifyClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    image_timeout: Duration,
}

impl DifyClient {
    #[must_use]
    pub fn new(client: Client, config: &AiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            image_timeout: Duration::from_secs(config.image_timeout_seconds),
        }
    }

    async fn chat(
        &self,
        operation: &'static str,
        query: &str,
        user: &str,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        let start = Instant::now();
        let result = self.send(query, user, timeout).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(GatewayError::ExternalService(_)) => "external_error",
            Err(GatewayError::ResponseFormat(_)) => "format_error",
        };
        metrics::counter!("ai_requests_total", "operation" => operation, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("ai_request_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(_) => info!(
                event = "ai_request_finished",
                operation,
                duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            ),
            Err(e) => warn!(event = "ai_request_failed", operation, error = %e),
        }

        result
    }

    async fn send(&self, query: &str, user: &str, timeout: Duration) -> Result<Value, GatewayError> {
        let url = format!("{}/chat-messages", self.base_url);
        let body = ChatRequest {
            inputs: serde_json::Map::new(),
            query,
            response_mode: "blocking",
            user,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::ExternalService(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            debug!(status = %status, body = %truncate(&text, 500), "AI service error body");
            return Err(GatewayError::ExternalService(format!(
                "AI service returned status {status}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GatewayError::ResponseFormat(format!("response body is not JSON: {e}")))
    }
}

fn answer_text(response: &Value) -> String {
    response
        .get("answer")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[async_trait]
impl AiGateway for DifyClient {
    async fn generate_content(&self, request: &ContentRequest) -> Result<Generation, GatewayError> {
        let query = prompts::generation_prompt(request);
        let user = format!("company_{}", request.company_name);

        let response = self.chat("generate", &query, &user, self.timeout).await?;
        let raw_answer = answer_text(&response);
        debug!(answer = %truncate(&raw_answer, 100), "Generation answer received");

        Ok(Generation {
            content: parse::parse_content(&raw_answer)?,
            raw_answer,
        })
    }

    async fn generate_image(
        &self,
        image_prompt: &str,
        context: Option<&ImageContext>,
    ) -> Result<Option<String>, GatewayError> {
        let enriched = prompts::enrich_image_prompt(image_prompt, context);
        let query = prompts::image_prompt(&enriched);

        let response = self
            .chat("image", &query, "image_generation", self.image_timeout)
            .await?;

        match image_url::extract_image_url(&response, &self.base_url) {
            Some((strategy, url)) => {
                debug!(strategy, url = %truncate(&url, 100), "Image reference found");
                Ok(Some(url))
            }
            None => {
                let keys: Vec<&str> = response
                    .as_object()
                    .map(|o| o.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                warn!(response_keys = ?keys, "No image reference in AI response");
                Ok(None)
            }
        }
    }

    async fn regenerate_content(
        &self,
        original: &AdSnapshot,
        image_only: bool,
        extra_instructions: Option<&str>,
    ) -> Result<Generation, GatewayError> {
        let query = prompts::regeneration_prompt(original, image_only, extra_instructions);
        let user = format!("regen_{}", original.company_name);
        let operation = if image_only { "regenerate_image" } else { "regenerate" };

        let response = self.chat(operation, &query, &user, self.timeout).await?;
        let raw_answer = answer_text(&response);

        Ok(Generation {
            content: parse::parse_content(&raw_answer)?,
            raw_answer,
        })
    }

    async fn evaluate_content(&self, ad: &AdSnapshot) -> Result<EvaluationPayload, GatewayError> {
        let query = prompts::evaluation_prompt(ad);
        let user = format!("eval_{}", ad.ad_id);

        let response = self.chat("evaluate", &query, &user, self.timeout).await?;
        parse::parse_evaluation(&answer_text(&response))
    }
}
