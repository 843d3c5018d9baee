pub mod analytics;
pub mod image;
pub mod mailer;
pub mod scheduler;
pub mod tokens;

pub use image::ImageService;
pub use mailer::{EmailTemplates, LogMailer, Mailer};
pub use scheduler::Scheduler;
pub use tokens::TokenIssuer;

pub mod ad_service;
pub mod ad_service_impl;
pub use ad_service::{AdError, AdService};
pub use ad_service_impl::SeaOrmAdService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, AuthSession, RegisterRequest, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UserError, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod company_service;
pub mod company_service_impl;
pub use company_service::{CompanyError, CompanyService};
pub use company_service_impl::SeaOrmCompanyService;

pub mod admin_service;
pub mod admin_service_impl;
pub use admin_service::{AdminError, AdminService};
pub use admin_service_impl::SeaOrmAdminService;
