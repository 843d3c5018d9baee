use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub ai: AiConfig,

    pub auth: AuthConfig,

    pub usage: UsageConfig,

    pub scheduler: SchedulerConfig,

    pub email: EmailConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub app_name: String,

    pub database_path: String,

    pub log_level: String,

    /// Root directory for downloaded ad images; served under `/static/images`.
    pub images_path: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            app_name: "Eventaic".to_string(),
            database_path: "sqlite:data/eventaic.db".to_string(),
            log_level: "info".to_string(),
            images_path: "static/images".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub api_prefix: String,

    pub cors_allowed_origins: Vec<String>,

    /// "development" or "production". Production hides error detail.
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            api_prefix: "/api/v1".to_string(),
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            environment: "development".to_string(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Settings for the external chat-messages endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: String,

    pub api_key: String,

    /// Timeout for content, regeneration and evaluation calls.
    pub timeout_seconds: u64,

    /// Timeout for image-generation calls.
    pub image_timeout_seconds: u64,

    /// Timeout for downloading the generated image itself.
    pub download_timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dify.ai/v1".to_string(),
            api_key: String::new(),
            timeout_seconds: 60,
            image_timeout_seconds: 60,
            download_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret for access and refresh tokens.
    pub jwt_secret: String,

    pub access_token_minutes: i64,

    pub refresh_token_days: i64,

    pub password_reset_hours: i64,

    pub email_verification_hours: i64,

    /// Reject logins from accounts whose email is not verified.
    pub email_verification_required: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production-please-use-32-chars".to_string(),
            access_token_minutes: 30,
            refresh_token_days: 7,
            password_reset_hours: 24,
            email_verification_hours: 48,
            email_verification_required: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub default_monthly_ad_limit: i32,

    pub max_monthly_ad_limit: i32,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            default_monthly_ad_limit: 100,
            max_monthly_ad_limit: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Zero every company's monthly counter on a cron schedule.
    pub usage_reset_enabled: bool,

    pub usage_reset_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            usage_reset_enabled: false,
            usage_reset_cron: "0 0 0 1 * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub from_address: String,

    pub frontend_url: String,

    pub reset_path: String,

    pub verify_path: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from_address: "noreply@eventaic.local".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            reset_path: "/reset-password".to_string(),
            verify_path: "/verify-email".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub json_logs: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "eventaic".to_string());

        Self {
            metrics_enabled: true,
            json_logs: false,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            ai: AiConfig::default(),
            auth: AuthConfig::default(),
            usage: UsageConfig::default(),
            scheduler: SchedulerConfig::default(),
            email: EmailConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // A missing .env is the normal case outside development.
        let _ = dotenvy::dotenv();

        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Secrets and deployment-specific values may come from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("EVENTAIC_DATABASE_URL") {
            self.general.database_path = url;
        }
        if let Some(url) = lookup("EVENTAIC_AI_BASE_URL") {
            self.ai.base_url = url;
        }
        if let Some(key) = lookup("EVENTAIC_AI_API_KEY") {
            self.ai.api_key = key;
        }
        if let Some(secret) = lookup("EVENTAIC_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(port) = lookup("EVENTAIC_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(env) = lookup("EVENTAIC_ENVIRONMENT") {
            self.server.environment = env;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("eventaic").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".eventaic").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ai.base_url.trim().is_empty() {
            anyhow::bail!("AI base URL cannot be empty");
        }

        if self.auth.jwt_secret.len() < 32 {
            anyhow::bail!("JWT secret must be at least 32 characters");
        }

        if self.usage.default_monthly_ad_limit < 0
            || self.usage.default_monthly_ad_limit > self.usage.max_monthly_ad_limit
        {
            anyhow::bail!(
                "Default monthly ad limit must be between 0 and {}",
                self.usage.max_monthly_ad_limit
            );
        }

        if !self.server.api_prefix.starts_with('/') {
            anyhow::bail!("API prefix must start with '/'");
        }

        if self.server.is_production() && self.auth.jwt_secret == AuthConfig::default().jwt_secret
        {
            anyhow::bail!("The default JWT secret cannot be used in production");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.api_prefix, "/api/v1");
        assert_eq!(config.ai.timeout_seconds, 60);
        assert_eq!(config.usage.default_monthly_ad_limit, 100);
        assert_eq!(config.usage.max_monthly_ad_limit, 10_000);
        assert_eq!(config.auth.access_token_minutes, 30);
        assert!(!config.scheduler.usage_reset_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[ai]"));
        assert!(toml_str.contains("[usage]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [usage]
            default_monthly_ad_limit = 25
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.usage.default_monthly_ad_limit, 25);

        assert_eq!(config.ai.base_url, "https://api.dify.ai/v1");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "EVENTAIC_AI_API_KEY" => Some("app-secret".to_string()),
            "EVENTAIC_PORT" => Some("9100".to_string()),
            _ => None,
        });

        assert_eq!(config.ai.api_key, "app-secret");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.general.database_path, "sqlite:data/eventaic.db");
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = Config::default();
        config.usage.default_monthly_ad_limit = 20_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.environment = "production".to_string();
        assert!(config.validate().is_err());
    }
}
