use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CheckHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CheckHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CheckHistory::ConfigId).string_len(64).not_null())
                    .col(ColumnDef::new(CheckHistory::Name).string_len(100).not_null())
                    .col(ColumnDef::new(CheckHistory::Type).string_len(50).not_null())
                    .col(ColumnDef::new(CheckHistory::Endpoint).string_len(512).not_null())
                    .col(ColumnDef::new(CheckHistory::Model).string_len(100).not_null())
                    .col(ColumnDef::new(CheckHistory::GroupName).string_len(100))
                    .col(ColumnDef::new(CheckHistory::Status).string_len(32).not_null())
                    .col(ColumnDef::new(CheckHistory::LatencyMs).integer())
                    .col(ColumnDef::new(CheckHistory::PingLatencyMs).integer())
                    .col(
                        ColumnDef::new(CheckHistory::Message)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(CheckHistory::CheckedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按 Provider 倒序读取历史
        manager
            .create_index(
                Index::create()
                    .name("idx_check_history_config_checked_at")
                    .table(CheckHistory::Table)
                    .col(CheckHistory::ConfigId)
                    .col(CheckHistory::CheckedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_check_history_checked_at")
                    .table(CheckHistory::Table)
                    .col(CheckHistory::CheckedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CheckHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CheckHistory {
    Table,
    Id,
    ConfigId,
    Name,
    Type,
    Endpoint,
    Model,
    GroupName,
    Status,
    LatencyMs,
    PingLatencyMs,
    Message,
    CheckedAt,
}
