use serde::Serialize;

use crate::domain::{CompanyId, UserId, UserRole};
use crate::entities::users;

/// User data returned from the store (without sensitive token or hash columns)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub is_active: bool,
    pub is_deleted: bool,
    pub company_id: Option<CompanyId>,
    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            email: model.email,
            username: model.username,
            full_name: model.full_name,
            phone: model.phone,
            role: UserRole::from_db(&model.role),
            is_email_verified: model.is_email_verified,
            is_active: model.is_active,
            is_deleted: model.is_deleted,
            company_id: model.company_id.map(CompanyId::new),
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_login: model.last_login,
        }
    }
}
