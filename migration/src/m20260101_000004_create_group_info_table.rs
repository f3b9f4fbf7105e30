use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GroupInfo::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupInfo::GroupName)
                            .string_len(100)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupInfo::WebsiteUrl).string_len(512))
                    .col(ColumnDef::new(GroupInfo::Description).text())
                    .col(
                        ColumnDef::new(GroupInfo::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GroupInfo::UpdatedAt)
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
            .drop_table(Table::drop().table(GroupInfo::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GroupInfo {
    Table,
    GroupName,
    WebsiteUrl,
    Description,
    CreatedAt,
    UpdatedAt,
}
