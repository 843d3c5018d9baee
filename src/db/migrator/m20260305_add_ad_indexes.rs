use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ads_company_created")
                    .table(Ads::Table)
                    .col(Ads::CompanyId)
                    .col(Ads::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ads_parent")
                    .table(Ads::Table)
                    .col(Ads::ParentAdId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ad_evaluations_ad")
                    .table(AdEvaluations::Table)
                    .col(AdEvaluations::AdId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_ad_evaluations_ad").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_ads_parent").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_ads_company_created").to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Ads {
    Table,
    CompanyId,
    ParentAdId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AdEvaluations {
    Table,
    AdId,
}
