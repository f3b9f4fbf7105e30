use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CheckConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CheckConfigs::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CheckConfigs::Name).string_len(100).not_null())
                    .col(ColumnDef::new(CheckConfigs::Type).string_len(50).not_null())
                    .col(ColumnDef::new(CheckConfigs::Endpoint).string_len(512).not_null())
                    .col(ColumnDef::new(CheckConfigs::Model).string_len(100).not_null())
                    .col(ColumnDef::new(CheckConfigs::GroupName).string_len(100))
                    .col(
                        ColumnDef::new(CheckConfigs::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(CheckConfigs::IsMaintenance)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CheckConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CheckConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_check_configs_enabled")
                    .table(CheckConfigs::Table)
                    .col(CheckConfigs::Enabled)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CheckConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CheckConfigs {
    Table,
    Id,
    Name,
    Type,
    Endpoint,
    Model,
    GroupName,
    Enabled,
    IsMaintenance,
    CreatedAt,
    UpdatedAt,
}
