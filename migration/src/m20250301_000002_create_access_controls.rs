use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessControls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessControls::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(AccessControls::Who))
                    .col(string(AccessControls::Collection))
                    .col(string(AccessControls::Entity))
                    .col(big_integer(AccessControls::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // At most one entry per {who, collection, entity}. Concurrent grants
        // race on this index, not on anything held in the application.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_access_controls_who_collection_entity")
                    .table(AccessControls::Table)
                    .col(AccessControls::Who)
                    .col(AccessControls::Collection)
                    .col(AccessControls::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_access_controls_collection_entity")
                    .table(AccessControls::Table)
                    .col(AccessControls::Collection)
                    .col(AccessControls::Entity)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessControls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AccessControls {
    Table,
    Id,
    Who,
    Collection,
    Entity,
    CreatedAt,
}
