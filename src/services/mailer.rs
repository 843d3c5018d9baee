use async_trait::async_trait;
use tracing::info;

use crate::config::{Config, EmailConfig};

/// A transactional email ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outgoing mail seam. Delivery failures are reported, never fatal to the
/// operation that triggered them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Writes each message to the log instead of delivering it.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    #[must_use]
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            from: config.from_address.clone(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        info!(
            event = "email_logged",
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            "Email delivery disabled; message logged"
        );
        info!(body = %email.body, "Email body");
        Ok(())
    }
}

/// Builds the account emails from configuration.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    app_name: String,
    frontend_url: String,
    reset_path: String,
    verify_path: String,
}

impl EmailTemplates {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            app_name: config.general.app_name.clone(),
            frontend_url: config.email.frontend_url.trim_end_matches('/').to_string(),
            reset_path: config.email.reset_path.clone(),
            verify_path: config.email.verify_path.clone(),
        }
    }

    fn link(&self, path: &str, token: &str) -> String {
        format!("{}{path}?token={token}", self.frontend_url)
    }

    #[must_use]
    pub fn verification(&self, to: &str, username: &str, token: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: format!("Verify your email - {}", self.app_name),
            body: format!(
                "Hi {username},\n\nPlease confirm your email address for {} by opening the link below:\n\n{}\n\nThe link expires in 48 hours.",
                self.app_name,
                self.link(&self.verify_path, token)
            ),
        }
    }

    #[must_use]
    pub fn password_reset(&self, to: &str, username: &str, token: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: format!("Reset your password - {}", self.app_name),
            body: format!(
                "Hi {username},\n\nA password reset was requested for your account. Open the link below to choose a new password:\n\n{}\n\nThe link expires in 24 hours. If you did not request this, ignore this email.",
                self.link(&self.reset_path, token)
            ),
        }
    }

    #[must_use]
    pub fn welcome(&self, to: &str, username: &str, company_name: Option<&str>) -> Email {
        let greeting = company_name.map_or_else(String::new, |c| format!(" and {c}"));
        Email {
            to: to.to_string(),
            subject: format!("Welcome to {}!", self.app_name),
            body: format!(
                "Hi {username},\n\nWelcome to {}! Your account{greeting} is ready to start generating ads.",
                self.app_name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_use_frontend_url() {
        let mut config = Config::default();
        config.email.frontend_url = "https://app.example.com/".to_string();
        let templates = EmailTemplates::new(&config);

        let email = templates.password_reset("a@b.co", "alice", "tok123");
        assert_eq!(email.to, "a@b.co");
        assert!(email.subject.starts_with("Reset your password"));
        assert!(email.body.contains("https://app.example.com/reset-password?token=tok123"));

        let email = templates.verification("a@b.co", "alice", "v1");
        assert!(email.body.contains("/verify-email?token=v1"));
    }
}
