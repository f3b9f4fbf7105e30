use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 全局只有一行，由应用在首次使用时插入
        manager
            .create_table(
                Table::create()
                    .table(PollerLease::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollerLease::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PollerLease::HolderNodeId)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(PollerLease::AcquiredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollerLease::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollerLease::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollerLease::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PollerLease {
    Table,
    Id,
    HolderNodeId,
    AcquiredAt,
    ExpiresAt,
    UpdatedAt,
}
