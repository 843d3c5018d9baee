use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ad_evaluations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub ad_id: i32,
    pub relevance_score: f64,
    pub clarity_score: f64,
    pub persuasiveness_score: f64,
    pub brand_safety_score: f64,
    pub overall_score: f64,
    #[sea_orm(column_type = "Text")]
    pub feedback: String,
    /// JSON array of strings
    #[sea_orm(column_type = "Text")]
    pub recommendations: String,
    pub evaluator_model: String,
    #[sea_orm(column_type = "Text")]
    pub evaluation_prompt: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ads::Entity",
        from = "Column::AdId",
        to = "super::ads::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Ads,
}

impl Related<super::ads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
