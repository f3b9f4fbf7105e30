pub use sea_orm_migration::prelude::*;

mod m20260101_000001_create_check_configs_table;
mod m20260101_000002_create_check_history_table;
mod m20260101_000003_create_poller_lease_table;
mod m20260101_000004_create_group_info_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_check_configs_table::Migration),
            Box::new(m20260101_000002_create_check_history_table::Migration),
            Box::new(m20260101_000003_create_poller_lease_table::Migration),
            Box::new(m20260101_000004_create_group_info_table::Migration),
        ]
    }
}
