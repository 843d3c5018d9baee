//! End-to-end tests driving the router with a scripted AI gateway.

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use eventaic::api::AppState;
use eventaic::clients::dify::parse::{parse_content, parse_evaluation};
use eventaic::clients::dify::{
    AdSnapshot, AiGateway, ContentRequest, EvaluationPayload, GatewayError, Generation,
    ImageContext,
};
use eventaic::config::Config;
use eventaic::domain::{AdId, CompanyId};
use eventaic::services::LogMailer;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

const PASSWORD: &str = "Str0ng!pass";

#[derive(Default)]
struct ScriptedGateway {
    content_calls: AtomicUsize,
    image_calls: AtomicUsize,
    images_unavailable: AtomicBool,
}

impl ScriptedGateway {
    fn content_answer(headline: &str) -> String {
        format!(
            r##"Sure! Here is your campaign:
{{"headline": "{headline}", "description": "Fresh deals", "slogan": "Shop now",
  "cta_text": "Buy", "image_prompt": "A bright storefront",
  "keywords": ["deal"], "hashtags": ["#deal"], "platforms": ["instagram"],
  "posting_times": ["09:00"]}}
Hope this helps."##
        )
    }
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    async fn generate_content(&self, request: &ContentRequest) -> Result<Generation, GatewayError> {
        let n = self.content_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let raw_answer = Self::content_answer(&format!("{} #{n}", request.event_name));
        Ok(Generation {
            content: parse_content(&raw_answer)?,
            raw_answer,
        })
    }

    async fn generate_image(
        &self,
        _image_prompt: &str,
        _context: Option<&ImageContext>,
    ) -> Result<Option<String>, GatewayError> {
        if self.images_unavailable.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let n = self.image_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let payload = BASE64.encode(format!("fake-png-{n}"));
        Ok(Some(format!("data:image/png;base64,{payload}")))
    }

    async fn regenerate_content(
        &self,
        original: &AdSnapshot,
        _image_only: bool,
        _extra_instructions: Option<&str>,
    ) -> Result<Generation, GatewayError> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        let raw_answer = Self::content_answer(&format!("{} (v2)", original.headline));
        Ok(Generation {
            content: parse_content(&raw_answer)?,
            raw_answer,
        })
    }

    async fn evaluate_content(&self, _ad: &AdSnapshot) -> Result<EvaluationPayload, GatewayError> {
        parse_evaluation(
            r#"```json
{"relevance_score": 7, "clarity_score": -3, "persuasiveness_score": 8.5,
 "brand_safety_score": 9, "overall_score": 15, "feedback": "Strong",
 "recommendations": ["Shorter headline"]}
```"#,
        )
    }
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    gateway: Arc<ScriptedGateway>,
    // Declared last so the pool closes before the directory is removed
    _dir: TempDir,
}

async fn spawn_app() -> TestApp {
    let dir = TempDir::new().expect("failed to create temp dir");
    let db_path = dir.path().join("eventaic.db");
    let images_path = dir.path().join("images");

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.general.images_path = images_path.display().to_string();
    config.auth.email_verification_required = false;

    let gateway = Arc::new(ScriptedGateway::default());
    let mailer = Arc::new(LogMailer::new(&config.email));

    let state =
        eventaic::api::create_app_state_with_gateway(config, gateway.clone(), mailer, None)
            .await
            .expect("failed to create app state");
    let router = eventaic::api::router(state.clone());

    TestApp {
        router,
        state,
        gateway,
        _dir: dir,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{uri}"));
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Registers an account and returns its session payload.
    async fn register(&self, username: &str, company: Option<&str>) -> Value {
        let (status, body) = self
            .call(
                "POST",
                "/auth/register",
                None,
                Some(json!({
                    "email": format!("{username}@example.com"),
                    "username": username,
                    "password": PASSWORD,
                    "company_name": company,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"].clone()
    }

    async fn generate(&self, token: &str, event: &str) -> (StatusCode, Value) {
        self.call(
            "POST",
            "/ads/generate",
            Some(token),
            Some(json!({
                "event_name": event,
                "product_categories": ["shoes", "bags", "shoes"],
                "location": "Lisbon",
            })),
        )
        .await
    }
}

fn token(session: &Value) -> String {
    session["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_fallback() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.call("GET", "/does-not-exist", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_auth_flow() {
    let app = spawn_app().await;

    let admin = app.register("root", None).await;
    assert_eq!(admin["user"]["role"], "super_admin");
    assert_eq!(admin["token_type"], "bearer");

    let member = app.register("ana", Some("Acme")).await;
    assert_eq!(member["user"]["role"], "company");
    assert_eq!(member["user"]["company_name"], "Acme");

    // Only the first account may skip the company
    let (status, _) = app
        .call(
            "POST",
            "/auth/register",
            None,
            Some(json!({"email": "x@example.com", "username": "xavier", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            "POST",
            "/auth/register",
            None,
            Some(json!({"email": "ANA@example.com", "username": "ana2", "password": PASSWORD, "company_name": "Acme"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(
            "POST",
            "/auth/register",
            None,
            Some(json!({"email": "weak@example.com", "username": "weak", "password": "password", "company_name": "Acme"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, login) = app
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": "Ana@Example.com", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = login["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = login["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": "ana", "password": "Wr0ng!pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = app.call("GET", "/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["username"], "ana");
    assert!(me["data"]["last_login"].is_string());

    let (status, _) = app.call("GET", "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An access token is not a refresh token
    let (status, _) = app
        .call("POST", "/auth/refresh", None, Some(json!({"refresh_token": access})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call("POST", "/auth/refresh", None, Some(json!({"refresh_token": refresh})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            "POST",
            "/auth/change-password",
            Some(&access),
            Some(json!({"current_password": PASSWORD, "new_password": "N3w!password"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": "ana", "password": "N3w!password"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_generate_and_quota() {
    let app = spawn_app().await;
    let admin = token(&app.register("root", None).await);
    let member = app.register("ana", Some("Acme")).await;
    let company_id = member["user"]["company_id"].as_i64().unwrap();
    let member = token(&member);

    let (status, _) = app
        .call(
            "PUT",
            &format!("/admin/companies/{company_id}/limits?monthly_limit=1"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, ad) = app.generate(&member, "Black Friday").await;
    assert_eq!(status, StatusCode::CREATED);
    let ad = &ad["data"];
    assert_eq!(ad["status"], "generated");
    assert_eq!(ad["ad_type"], "product_gen");
    assert_eq!(ad["company_name"], "Acme");
    assert_eq!(ad["product_categories"], json!(["shoes", "bags"]));
    assert_eq!(ad["content"]["headline"], "Black Friday #1");
    assert!(
        ad["content"]["image_url"]
            .as_str()
            .unwrap()
            .starts_with("/static/images/ads/")
    );

    let (status, body) = app.generate(&member, "Cyber Monday").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
    assert_eq!(app.gateway.content_calls.load(Ordering::SeqCst), 1);

    let (status, dashboard) = app.call("GET", "/company/dashboard", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["data"]["ads_generated_this_month"], 1);
    assert_eq!(dashboard["data"]["remaining_monthly_limit"], 0);

    let (status, _) = app
        .call(
            "POST",
            "/ads/generate",
            Some(&member),
            Some(json!({"event_name": "", "product_categories": ["shoes"]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            "GET",
            "/company/usage?start_date=0001-01-01&end_date=9999-12-31",
            Some(&member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_survives_image_failure() {
    let app = spawn_app().await;
    let member = app.register("ana", Some("Acme")).await;
    let company_id = CompanyId::new(i32::try_from(member["user"]["company_id"].as_i64().unwrap()).unwrap());
    let member = token(&member);
    app.gateway.images_unavailable.store(true, Ordering::SeqCst);

    let (status, ad) = app.generate(&member, "Flash Sale").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ad["data"]["status"], "generated");
    assert_eq!(ad["data"]["content"]["headline"], "Flash Sale #1");
    assert_eq!(ad["data"]["content"]["image_url"], Value::Null);

    let (status, dashboard) = app.call("GET", "/company/dashboard", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["data"]["ads_generated_this_month"], 1);
    assert_eq!(dashboard["data"]["total_ads_generated"], 1);

    let company = app.state.store().get_company(company_id).await.unwrap().unwrap();
    assert_eq!(company.ads_generated_this_month, 1);
    assert_eq!(company.total_ads_generated, 1);
}

#[tokio::test]
async fn test_regeneration_lineage() {
    let app = spawn_app().await;
    let member = token(&app.register("ana", Some("Acme")).await);

    let (_, a) = app.generate(&member, "Summer Sale").await;
    let a_id = a["data"]["id"].as_i64().unwrap();

    let (status, b) = app
        .call("POST", "/ads/regenerate", Some(&member), Some(json!({"ad_id": a_id})))
        .await;
    assert_eq!(status, StatusCode::OK);
    let b = &b["data"];
    assert_eq!(b["parent_ad_id"], a_id);
    assert_eq!(b["regeneration_count"], 1);
    assert_eq!(b["status"], "regenerated");
    assert_eq!(b["ad_type"], "regen");
    assert_eq!(b["event_name"], "Summer Sale");
    let b_id = b["id"].as_i64().unwrap();

    let (_, c) = app
        .call(
            "POST",
            "/ads/regenerate",
            Some(&member),
            Some(json!({"ad_id": b_id, "additional_instructions": "More playful"})),
        )
        .await;
    let c_id = c["data"]["id"].as_i64().unwrap();
    assert_eq!(c["data"]["parent_ad_id"], b_id);
    assert_eq!(c["data"]["regeneration_count"], 2);

    for id in [a_id, b_id, c_id] {
        let (status, history) = app
            .call("GET", &format!("/ads/{id}/history"), Some(&member), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = history["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|ad| ad["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![a_id, b_id, c_id]);
    }

    let (_, page) = app.call("GET", "/ads?per_page=2", Some(&member), None).await;
    assert_eq!(page["data"]["total"], 3);
    assert_eq!(page["data"]["ads"].as_array().unwrap().len(), 2);
    assert_eq!(page["data"]["ads"][0]["id"], c_id);

    let (_, filtered) = app
        .call("GET", "/ads?status=regenerated", Some(&member), None)
        .await;
    assert_eq!(filtered["data"]["total"], 2);

    let (status, _) = app.call("GET", "/ads?status=bogus", Some(&member), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_only_regeneration_mutates_in_place() {
    let app = spawn_app().await;
    let member = token(&app.register("ana", Some("Acme")).await);

    let (_, ad) = app.generate(&member, "Spring Launch").await;
    let ad_id = ad["data"]["id"].as_i64().unwrap();
    let first_url = ad["data"]["content"]["image_url"].as_str().unwrap().to_string();

    let (status, updated) = app
        .call(
            "POST",
            "/ads/regenerate",
            Some(&member),
            Some(json!({"ad_id": ad_id, "regenerate_image": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["id"], ad_id);
    assert_eq!(updated["data"]["regeneration_count"], 1);
    assert_eq!(updated["data"]["status"], "generated");
    assert_ne!(updated["data"]["content"]["image_url"], first_url.as_str());

    let (_, page) = app.call("GET", "/ads", Some(&member), None).await;
    assert_eq!(page["data"]["total"], 1);

    // Stored image is returned unless forced
    let (status, image) = app
        .call("POST", "/ads/generate-image", Some(&member), Some(json!({"ad_id": ad_id})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image["data"]["image_url"], updated["data"]["content"]["image_url"]);

    app.gateway.images_unavailable.store(true, Ordering::SeqCst);
    let (status, _) = app
        .call(
            "POST",
            "/ads/generate-image",
            Some(&member),
            Some(json!({"ad_id": ad_id, "force_regenerate": true})),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, unchanged) = app
        .call("GET", &format!("/ads/{ad_id}"), Some(&member), None)
        .await;
    assert_eq!(unchanged["data"]["regeneration_count"], 1);
    assert_eq!(
        unchanged["data"]["content"]["image_url"],
        updated["data"]["content"]["image_url"]
    );
}

#[tokio::test]
async fn test_evaluation_clamps_and_delete_cascades() {
    let app = spawn_app().await;
    let member = token(&app.register("ana", Some("Acme")).await);

    let (_, ad) = app.generate(&member, "Holiday").await;
    let ad_id = ad["data"]["id"].as_i64().unwrap();

    let (status, eval) = app
        .call("POST", "/ads/evaluate", Some(&member), Some(json!({"ad_id": ad_id})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(eval["data"]["overall_score"], 10.0);
    assert_eq!(eval["data"]["clarity_score"], 0.0);
    assert_eq!(eval["data"]["persuasiveness_score"], 8.5);

    let (_, evaluated) = app
        .call("GET", &format!("/ads/{ad_id}"), Some(&member), None)
        .await;
    assert_eq!(evaluated["data"]["status"], "evaluated");
    assert_eq!(evaluated["data"]["evaluation_score"], 10.0);

    let id = AdId::new(i32::try_from(ad_id).unwrap());
    assert_eq!(app.state.store().get_ad_evaluations(id).await.unwrap().len(), 1);

    let (status, body) = app
        .call("DELETE", &format!("/ads/{ad_id}"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app
        .call("GET", &format!("/ads/{ad_id}"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.state.store().get_ad_evaluations(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tenant_isolation_and_admin_guard() {
    let app = spawn_app().await;
    let admin = token(&app.register("root", None).await);
    let acme = token(&app.register("ana", Some("Acme")).await);
    let globex = token(&app.register("hank", Some("Globex")).await);

    let (_, ad) = app.generate(&acme, "Launch Party").await;
    let ad_id = ad["data"]["id"].as_i64().unwrap();

    for caller in [&globex, &admin] {
        let (status, _) = app
            .call("GET", &format!("/ads/{ad_id}"), Some(caller), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .call("DELETE", &format!("/ads/{ad_id}"), Some(caller), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = app.call("GET", "/ads/999999", Some(&acme), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call("GET", "/admin/dashboard", Some(&acme), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call("GET", "/company/dashboard", Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, dashboard) = app.call("GET", "/admin/dashboard", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["data"]["total_companies"], 2);
    assert_eq!(dashboard["data"]["total_ads_generated"], 1);

    let (status, companies) = app
        .call("GET", "/admin/companies?search=acme", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(companies["data"]["total"], 1);
    let acme_id = companies["data"]["companies"][0]["id"].as_i64().unwrap();

    let (status, _) = app
        .call(
            "PUT",
            &format!("/admin/companies/{acme_id}/deactivate"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.generate(&acme, "After Hours").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            "PUT",
            &format!("/admin/companies/{acme_id}/limits?monthly_limit=-1"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
