//! # 官方状态类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 官方状态页给出的整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficialStatusLevel {
    Operational,
    Degraded,
    Down,
    Unknown,
}

impl OfficialStatusLevel {
    /// 解析 Statuspage 的 `status.indicator`
    #[must_use]
    pub fn from_indicator(indicator: &str) -> Self {
        match indicator {
            "none" => Self::Operational,
            "minor" | "maintenance" => Self::Degraded,
            "major" | "critical" => Self::Down,
            _ => Self::Unknown,
        }
    }
}

/// Provider 类型对应的官方状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialStatus {
    pub status: OfficialStatusLevel,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}
