//! 集成测试公共工具
#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use check_cx::types::{CheckResult, CheckStatus};
use entity::{check_configs, group_info};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

/// 已迁移的内存数据库
pub async fn setup_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Arc::new(db)
}

pub struct ConfigRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub group: Option<&'a str>,
    pub enabled: bool,
    pub maintenance: bool,
}

impl<'a> ConfigRow<'a> {
    pub const fn active(id: &'a str, name: &'a str) -> Self {
        Self {
            id,
            name,
            group: None,
            enabled: true,
            maintenance: false,
        }
    }

    pub async fn insert(self, db: &DatabaseConnection) {
        check_configs::ActiveModel {
            id: Set(self.id.to_string()),
            name: Set(self.name.to_string()),
            provider_type: Set("openai".to_string()),
            endpoint: Set(format!("https://{}.example/v1/chat/completions", self.id)),
            model: Set("gpt-4o-mini".to_string()),
            group_name: Set(self.group.map(str::to_string)),
            enabled: Set(self.enabled),
            is_maintenance: Set(self.maintenance),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap();
    }
}

pub async fn insert_group(db: &DatabaseConnection, name: &str, website: Option<&str>) {
    group_info::ActiveModel {
        group_name: Set(name.to_string()),
        website_url: Set(website.map(str::to_string)),
        description: Set(Some(format!("{name} providers"))),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap();
}

pub fn result_at(id: &str, status: CheckStatus, checked_at: DateTime<Utc>) -> CheckResult {
    CheckResult {
        id: id.to_string(),
        name: format!("Provider {id}"),
        provider_type: "openai".to_string(),
        endpoint: format!("https://{id}.example/v1/chat/completions"),
        model: "gpt-4o-mini".to_string(),
        status,
        latency_ms: Some(420),
        ping_latency_ms: Some(35),
        message: "HTTP 200".to_string(),
        checked_at,
        group_name: None,
        official_status: None,
    }
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - TimeDelta::minutes(minutes)
}
