//! # 测试数据

use chrono::{DateTime, Utc};

use crate::dashboard::ProviderTimeline;
use crate::types::{CheckResult, CheckStatus, ProviderConfig};

/// `openai` 类型的活跃配置
#[must_use]
pub fn provider_config(id: &str, name: &str, group: Option<&str>) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        name: name.to_string(),
        provider_type: "openai".to_string(),
        endpoint: format!("https://provider.invalid/{id}/v1/chat/completions"),
        model: "gpt-4o-mini".to_string(),
        group_name: group.map(str::to_string),
        is_maintenance: false,
    }
}

#[must_use]
pub fn check_result(
    id: &str,
    name: &str,
    status: CheckStatus,
    checked_at: DateTime<Utc>,
) -> CheckResult {
    CheckResult {
        id: id.to_string(),
        name: name.to_string(),
        provider_type: "openai".to_string(),
        endpoint: format!("https://provider.invalid/{id}/v1/chat/completions"),
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

/// 只有一条记录的时间线
#[must_use]
pub fn timeline(id: &str, name: &str, group: Option<&str>) -> ProviderTimeline {
    let mut latest = check_result(id, name, CheckStatus::Operational, Utc::now());
    latest.group_name = group.map(str::to_string);
    ProviderTimeline {
        id: id.to_string(),
        items: vec![latest.clone()],
        latest,
    }
}

/// 由配置生成一条检测结果
#[must_use]
pub fn result_for(config: &ProviderConfig, status: CheckStatus) -> CheckResult {
    let mut result = check_result(&config.id, &config.name, status, Utc::now());
    result.group_name.clone_from(&config.group_name);
    result.provider_type.clone_from(&config.provider_type);
    result
}
