use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(unique)]
    pub username: String,

    pub full_name: Option<String>,
    pub phone: Option<String>,

    /// Argon2id password hash
    pub password_hash: String,

    /// `super_admin` or `company`
    pub role: String,

    pub is_email_verified: bool,

    /// SHA-256 hex digest of the token sent by email, never the token itself.
    pub email_verification_token: Option<String>,
    pub email_verification_sent_at: Option<String>,

    /// SHA-256 hex digest of the reset token.
    pub password_reset_token: Option<String>,
    pub password_reset_sent_at: Option<String>,

    pub is_active: bool,
    pub is_deleted: bool,

    pub company_id: Option<i32>,

    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Companies,
    #[sea_orm(has_many = "super::ads::Entity")]
    Ads,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::ads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
