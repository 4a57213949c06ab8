//! Initial migration: repository cache and page cursors.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_repositories(manager).await?;
        self.create_remote_keys(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RemoteKeys::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    // Naming
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    .col(ColumnDef::new(Repositories::OwnerLogin).string().not_null())
                    .col(
                        ColumnDef::new(Repositories::OwnerAvatarUrl)
                            .text()
                            .not_null(),
                    )
                    // Content
                    .col(ColumnDef::new(Repositories::Description).text().null())
                    .col(ColumnDef::new(Repositories::Language).string().null())
                    .col(
                        ColumnDef::new(Repositories::DefaultBranch)
                            .string()
                            .not_null()
                            .default("main"),
                    )
                    .col(ColumnDef::new(Repositories::UpdatedAt).string().not_null())
                    // Stars
                    .col(
                        ColumnDef::new(Repositories::StargazersCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::ForksCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::IsStarred)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(
                        ColumnDef::new(Repositories::SortIndex)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_sort_index")
                    .table(Repositories::Table)
                    .col(Repositories::SortIndex)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_owner_name")
                    .table(Repositories::Table)
                    .col(Repositories::OwnerLogin)
                    .col(Repositories::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_remote_keys(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RemoteKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RemoteKeys::RepoId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RemoteKeys::PrevKey).integer().null())
                    .col(ColumnDef::new(RemoteKeys::NextKey).integer().null())
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    Name,
    OwnerLogin,
    OwnerAvatarUrl,
    Description,
    Language,
    DefaultBranch,
    UpdatedAt,
    StargazersCount,
    ForksCount,
    IsStarred,
    SortIndex,
}

#[derive(DeriveIden)]
enum RemoteKeys {
    Table,
    RepoId,
    PrevKey,
    NextKey,
}
