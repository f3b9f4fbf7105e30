//! # 数据库模块
//!
//! 数据库连接和迁移管理

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{Context, Result};
use crate::{ensure_config, lerror, linfo, lwarn, logging::{LogComponent, LogStage}};

/// 初始化数据库连接
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    ensure_config!(
        config.is_sqlite(),
        "仅支持 SQLite 数据库，当前配置: {}",
        config.url
    );
    let url = config.get_connection_url()?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "connect",
        &format!("正在连接数据库: {url}")
    );

    let mut options = ConnectOptions::new(url);
    options
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .sqlx_logging(false);
    // 内存库每个连接都是独立的数据库，保持默认的单连接
    if !config.is_memory_database() {
        options.max_connections(config.max_connections);
    }

    let db = Database::connect(options).await.context("数据库连接失败")?;
    linfo!("system", LogStage::Startup, LogComponent::Database, "connect", "数据库连接成功");
    Ok(db)
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    linfo!("system", LogStage::Startup, LogComponent::Database, "migrate", "开始运行数据库迁移...");

    if let Err(e) = ::migration::Migrator::up(db, None).await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "migrate",
            &format!("数据库迁移失败: {e}")
        );
        return Err(e.into());
    }

    linfo!("system", LogStage::Startup, LogComponent::Database, "migrate", "数据库迁移完成");
    Ok(())
}

/// 检查是否有未应用的迁移
pub async fn check_database_status(db: &DatabaseConnection) -> Result<usize> {
    let pending = ::migration::Migrator::get_pending_migrations(db).await?;
    if pending.is_empty() {
        linfo!("system", LogStage::Startup, LogComponent::Database, "status", "所有迁移都已应用");
    } else {
        lwarn!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "status",
            &format!("有 {} 个待应用的迁移", pending.len())
        );
    }
    Ok(pending.len())
}
