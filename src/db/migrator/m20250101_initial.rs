use crate::entities::prelude::*;
use crate::entities::reviews;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

const REVIEWS_SUBJECT_MONTH_INDEX: &str = "idx_reviews_subject_month";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // The unique reg_number constraint comes from the entity definition.
        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Reviews)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(REVIEWS_SUBJECT_MONTH_INDEX)
                    .table(Reviews)
                    .col(reviews::Column::SubjectRegNumber)
                    .col(reviews::Column::MonthYear)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(REVIEWS_SUBJECT_MONTH_INDEX)
                    .table(Reviews)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Reviews).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
