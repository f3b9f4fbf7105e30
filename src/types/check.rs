//! # 检测结果类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::OfficialStatus;

/// Provider ID 到检测结果序列的映射
pub type HistorySnapshot = BTreeMap<String, Vec<CheckResult>>;

/// 单次检测的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Operational,
    Degraded,
    Failed,
    ValidationFailed,
    Error,
    Maintenance,
}

impl CheckStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::ValidationFailed => "validation_failed",
            Self::Error => "error",
            Self::Maintenance => "maintenance",
        }
    }

    /// 是否计入可用
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Operational | Self::Degraded)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operational" => Ok(Self::Operational),
            "degraded" => Ok(Self::Degraded),
            "failed" => Ok(Self::Failed),
            "validation_failed" => Ok(Self::ValidationFailed),
            "error" => Ok(Self::Error),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(format!("未知的检测状态: {other}")),
        }
    }
}

/// 一次检测的结果，写入后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub endpoint: String,
    pub model: String,
    pub status: CheckStatus,
    pub latency_ms: Option<u64>,
    pub ping_latency_ms: Option<u64>,
    pub message: String,
    pub checked_at: DateTime<Utc>,
    pub group_name: Option<String>,
    /// 读取时附加，不落库
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub official_status: Option<OfficialStatus>,
}

impl From<entity::check_history::Model> for CheckResult {
    fn from(row: entity::check_history::Model) -> Self {
        let status = row.status.parse().unwrap_or(CheckStatus::Error);
        Self {
            id: row.config_id,
            name: row.name,
            provider_type: row.provider_type,
            endpoint: row.endpoint,
            model: row.model,
            status,
            latency_ms: row.latency_ms.and_then(|v| u64::try_from(v).ok()),
            ping_latency_ms: row.ping_latency_ms.and_then(|v| u64::try_from(v).ok()),
            message: row.message,
            checked_at: row.checked_at,
            group_name: row.group_name,
            official_status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            CheckStatus::Operational,
            CheckStatus::Degraded,
            CheckStatus::Failed,
            CheckStatus::ValidationFailed,
            CheckStatus::Error,
            CheckStatus::Maintenance,
        ] {
            assert_eq!(status.as_str().parse::<CheckStatus>(), Ok(status));
        }
        assert!("exploded".parse::<CheckStatus>().is_err());
    }

    #[test]
    fn test_check_result_serializes_in_camel_case() {
        let result = CheckResult {
            id: "p1".to_string(),
            name: "OpenAI".to_string(),
            provider_type: "openai".to_string(),
            endpoint: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            status: CheckStatus::ValidationFailed,
            latency_ms: Some(321),
            ping_latency_ms: None,
            message: "ok".to_string(),
            checked_at: Utc::now(),
            group_name: None,
            official_status: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "openai");
        assert_eq!(json["status"], "validation_failed");
        assert_eq!(json["latencyMs"], 321);
        assert!(json["pingLatencyMs"].is_null());
        assert!(json.get("officialStatus").is_none());
    }
}
