//! # Provider 配置类型

use serde::{Deserialize, Serialize};

/// 被监控 Provider 的配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub endpoint: String,
    pub model: String,
    pub group_name: Option<String>,
    #[serde(rename = "is_maintenance")]
    pub is_maintenance: bool,
}

impl From<entity::check_configs::Model> for ProviderConfig {
    fn from(row: entity::check_configs::Model) -> Self {
        Self {
            id: row.id,
            name: row.name,
            provider_type: row.provider_type,
            endpoint: row.endpoint,
            model: row.model,
            group_name: row.group_name.filter(|name| !name.is_empty()),
            is_maintenance: row.is_maintenance,
        }
    }
}
