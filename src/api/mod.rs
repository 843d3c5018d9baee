use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::clients::dify::AiGateway;
use crate::config::Config;
use crate::services::{AdService, AdminService, AuthService, CompanyService, Mailer, UserService};
use crate::state::SharedState;

mod admin;
mod ads;
pub mod auth;
mod company;
mod error;
mod observability;
mod system;
mod types;
mod users;
pub mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn user_service(&self) -> &Arc<dyn UserService> {
        &self.shared.user_service
    }

    #[must_use]
    pub fn ad_service(&self) -> &Arc<dyn AdService> {
        &self.shared.ad_service
    }

    #[must_use]
    pub fn company_service(&self) -> &Arc<dyn CompanyService> {
        &self.shared.company_service
    }

    #[must_use]
    pub fn admin_service(&self) -> &Arc<dyn AdminService> {
        &self.shared.admin_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Same as [`create_app_state_from_config`] with a caller-supplied AI
/// gateway and mailer.
pub async fn create_app_state_with_gateway(
    config: Config,
    gateway: Arc<dyn AiGateway>,
    mailer: Arc<dyn Mailer>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_gateway(config, gateway, mailer).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let config = state.config();
    let api_prefix = config.server.api_prefix.trim_end_matches('/').to_string();
    let images_path = config.general.images_path.clone();
    let cors_origins = config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(public_routes())
        .merge(authenticated_routes(state.clone()))
        .with_state(state.clone());

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    let app = Router::new()
        .route("/health", get(system::health))
        .route("/metrics", get(observability::get_metrics))
        .with_state(state);

    // An empty prefix mounts the API at the root
    let app = if api_prefix.is_empty() {
        app.merge(api_router)
    } else {
        app.nest(&api_prefix, api_router)
    };

    app.nest_service("/static/images", ServeDir::new(images_path))
        .fallback(system::not_found)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route(
            "/auth/password-reset/request",
            post(auth::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
        .route("/auth/verify-email", post(auth::verify_email))
}

/// Everything behind the bearer token. Company and admin routes add their
/// role guard on top.
fn authenticated_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let company_routes = Router::new()
        .route("/company/dashboard", get(company::get_dashboard))
        .route("/company/usage", get(company::get_usage))
        .route(
            "/company/profile",
            get(company::get_profile).put(company::update_profile),
        )
        .route("/company/ads/statistics", get(company::get_ad_statistics))
        .route_layer(middleware::from_fn(auth::require_company_user));

    let admin_routes = Router::new()
        .route("/admin/dashboard", get(admin::get_dashboard))
        .route("/admin/companies", get(admin::list_companies))
        .route("/admin/companies/{id}", get(admin::get_company))
        .route(
            "/admin/companies/{id}/activate",
            put(admin::activate_company),
        )
        .route(
            "/admin/companies/{id}/deactivate",
            put(admin::deactivate_company),
        )
        .route(
            "/admin/companies/{id}/limits",
            put(admin::update_company_limits),
        )
        .route("/admin/statistics", get(admin::get_statistics))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", delete(admin::delete_user))
        .route_layer(middleware::from_fn(auth::require_super_admin));

    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/change-password", post(auth::change_password))
        .route("/auth/me", get(auth::get_current_user))
        .route(
            "/auth/resend-verification",
            post(auth::resend_verification),
        )
        .route(
            "/users/profile",
            get(users::get_profile)
                .put(users::update_profile)
                .delete(users::delete_account),
        )
        .route("/users/activity", get(users::get_activity))
        .route("/ads", get(ads::list_ads))
        .route("/ads/generate", post(ads::generate_ad))
        .route("/ads/regenerate", post(ads::regenerate_ad))
        .route("/ads/evaluate", post(ads::evaluate_ad))
        .route("/ads/generate-image", post(ads::generate_image))
        .route("/ads/{id}", get(ads::get_ad).delete(ads::delete_ad))
        .route("/ads/{id}/history", get(ads::ad_history))
        .merge(company_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
