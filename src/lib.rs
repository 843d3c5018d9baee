pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use db::{NewUser, Store};
use domain::UserRole;
use services::Scheduler;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists");
        }
        return Ok(());
    }

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = init_telemetry(&config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, prometheus_handle).await,
        Commands::Init => Ok(()),
        Commands::CreateAdmin {
            email,
            username,
            password,
        } => cmd_create_admin(&config, &email, &username, &password).await,
        Commands::ResetUsage => cmd_reset_usage(&config).await,
    }
}

fn init_telemetry(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = if config.observability.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder()
            .label("app", "eventaic")?
            .extra_field("env", config.server.environment.clone())?;
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.clone(), value.clone())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }
    Ok(prometheus_handle)
}

async fn serve(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("Eventaic v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let scheduler_config = config.scheduler.clone();
    let api_state = api::create_app_state_from_config(config, prometheus_handle).await?;

    // Dropping the job scheduler stops the job
    let _usage_reset = Scheduler::new(api_state.store().clone(), scheduler_config)
        .start()
        .await
        .context("Failed to start scheduler")?;

    let app = api::router(api_state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
        config.security.clone(),
    )
    .await
}

async fn cmd_create_admin(
    config: &Config,
    email: &str,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    use api::validation::{validate_email, validate_password, validate_username};

    let email = validate_email(email)?;
    validate_username(username)?;
    validate_password(password)?;

    let store = open_store(config).await?;

    if store.is_email_taken(&email, None).await? {
        anyhow::bail!("Email already registered: {email}");
    }
    if store.is_username_taken(username, None).await? {
        anyhow::bail!("Username already taken: {username}");
    }
    if store.count_super_admins().await? > 0 {
        warn!("A super admin already exists; creating another one");
    }

    let user = store
        .create_user(NewUser {
            email,
            username: username.to_string(),
            password: password.to_string(),
            full_name: None,
            phone: None,
            role: UserRole::SuperAdmin,
            company_id: None,
            is_email_verified: true,
        })
        .await?;

    info!(event = "super_admin_created", user_id = %user.id);
    println!("✓ Super admin '{}' created (id {})", user.username, user.id);
    Ok(())
}

async fn cmd_reset_usage(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let companies = services::scheduler::reset_monthly_usage(&store).await?;
    println!("✓ Monthly usage reset for {companies} companies");
    Ok(())
}
