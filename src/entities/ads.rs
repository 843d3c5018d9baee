use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub company_id: i32,
    pub user_id: i32,

    pub event_name: String,
    pub product_name: Option<String>,
    /// JSON array of strings
    #[sea_orm(column_type = "Text")]
    pub product_categories: String,
    pub location: Option<String>,

    pub headline: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub slogan: String,
    pub cta_text: String,
    /// JSON array of strings
    #[sea_orm(column_type = "Text")]
    pub keywords: String,
    /// JSON array of strings
    #[sea_orm(column_type = "Text")]
    pub hashtags: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub image_prompt: Option<String>,
    pub image_url: Option<String>,

    /// JSON array of platform names as returned by the model
    #[sea_orm(column_type = "Text")]
    pub platforms: String,
    /// JSON object
    #[sea_orm(column_type = "Text")]
    pub platform_details: String,
    /// JSON array of strings
    #[sea_orm(column_type = "Text")]
    pub recommended_posting_times: String,
    /// JSON object
    #[sea_orm(column_type = "Text")]
    pub budget_allocation: String,

    pub status: String,
    pub ad_type: String,

    pub evaluation_score: Option<f64>,
    /// JSON object of the last evaluation payload
    #[sea_orm(column_type = "Text", nullable)]
    pub evaluation_details: Option<String>,

    pub regeneration_count: i32,
    pub parent_ad_id: Option<i32>,

    /// Raw gateway reply kept for debugging model drift.
    #[sea_orm(column_type = "Text", nullable)]
    pub raw_response: Option<String>,

    pub created_at: String,
    pub updated_at: String,
    pub evaluated_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Companies,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentAdId",
        to = "Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Parent,
    #[sea_orm(has_many = "super::ad_evaluations::Entity")]
    AdEvaluations,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::ad_evaluations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdEvaluations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
