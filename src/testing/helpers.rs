//! # 测试辅助函数

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

/// 创建已迁移的内存数据库
pub async fn create_test_db() -> Result<Arc<DatabaseConnection>, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    migration::Migrator::up(&db, None).await?;
    Ok(Arc::new(db))
}
