//! 看板视图类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::CheckResult;

/// 单个 Provider 的时间线
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTimeline {
    pub id: String,
    /// 按检测时间倒序
    pub items: Vec<CheckResult>,
    pub latest: CheckResult,
}

impl ProviderTimeline {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.latest.name
    }

    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        self.latest.group_name.as_deref()
    }
}

/// 一个分组及其时间线
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedProviderTimelines {
    pub group_name: String,
    pub display_name: String,
    pub timelines: Vec<ProviderTimeline>,
}

/// 看板数据
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub provider_timelines: Vec<ProviderTimeline>,
    pub grouped_timelines: Vec<GroupedProviderTimelines>,
    pub last_updated: Option<DateTime<Utc>>,
    pub total: usize,
    pub poll_interval_label: String,
    pub poll_interval_ms: u64,
    /// 毫秒时间戳
    pub generated_at: i64,
}

/// 读取看板时的刷新策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// 总是经缓存刷新（仍受 TTL 与合并约束）
    Always,
    /// 仅当有活跃 Provider 且历史为空时刷新
    #[default]
    Missing,
    /// 只读
    Never,
}

impl RefreshMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Missing => "missing",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "missing" => Ok(Self::Missing),
            "never" => Ok(Self::Never),
            other => Err(format!("未知的刷新策略: {other}")),
        }
    }
}
