use std::sync::Arc;
use std::time::Duration;

use crate::clients::dify::{AiGateway, DifyClient};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AdService, AdminService, AuthService, CompanyService, EmailTemplates, ImageService, LogMailer,
    Mailer, SeaOrmAdService, SeaOrmAdminService, SeaOrmAuthService, SeaOrmCompanyService,
    SeaOrmUserService, UserService,
};

/// Build the HTTP client shared by the gateway and image downloads.
/// Per-request timeouts are set by the callers.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!("Eventaic/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub ad_service: Arc<dyn AdService>,

    pub company_service: Arc<dyn CompanyService>,

    pub admin_service: Arc<dyn AdminService>,
}

impl SharedState {
    /// Wires the production stack: the Dify gateway and the logging mailer.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(
            config
                .ai
                .timeout_seconds
                .max(config.ai.image_timeout_seconds)
                .max(config.ai.download_timeout_seconds),
        )?;
        let gateway: Arc<dyn AiGateway> = Arc::new(DifyClient::new(http_client.clone(), &config.ai));
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(&config.email));

        Self::build(config, gateway, mailer, http_client).await
    }

    /// Same wiring with caller-supplied gateway and mailer.
    pub async fn with_gateway(
        config: Config,
        gateway: Arc<dyn AiGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(config.ai.download_timeout_seconds)?;
        Self::build(config, gateway, mailer, http_client).await
    }

    async fn build(
        config: Config,
        gateway: Arc<dyn AiGateway>,
        mailer: Arc<dyn Mailer>,
        http_client: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
            config.security.clone(),
        )
        .await?;

        let image_service = ImageService::new(http_client, &config);

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.auth.clone(),
            &config.usage,
            mailer,
            EmailTemplates::new(&config),
        )) as Arc<dyn AuthService>;

        let user_service = Arc::new(SeaOrmUserService::new(store.clone())) as Arc<dyn UserService>;

        let ad_service = Arc::new(SeaOrmAdService::new(
            store.clone(),
            gateway,
            image_service,
        )) as Arc<dyn AdService>;

        let company_service =
            Arc::new(SeaOrmCompanyService::new(store.clone())) as Arc<dyn CompanyService>;

        let admin_service = Arc::new(SeaOrmAdminService::new(
            store.clone(),
            config.usage.max_monthly_ad_limit,
        )) as Arc<dyn AdminService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
            user_service,
            ad_service,
            company_service,
            admin_service,
        })
    }
}
