//! Key/value bookkeeping about the cache itself, starting with whose feed it
//! holds.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CacheMeta::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CacheMeta::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CacheMeta::Value).text().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CacheMeta::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CacheMeta {
    Table,
    Key,
    Value,
}
