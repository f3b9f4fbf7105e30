//! # 缓存键命名规范

use std::collections::BTreeSet;
use std::fmt;

/// 没有任何活跃配置时使用的占位
pub const EMPTY_ID_SET: &str = "__empty__";

/// 缓存键类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey<'a> {
    /// 看板历史快照 - `{poll_interval_ms}:{id1|id2|...}`
    PollHistory {
        poll_interval_ms: u64,
        config_ids: &'a BTreeSet<String>,
    },

    /// 可用性统计 - `availability:{id1|id2|...}`
    Availability { config_ids: &'a BTreeSet<String> },

    /// 分组信息 - `group:{name}`
    GroupInfo { group_name: &'a str },
}

impl CacheKey<'_> {
    /// 生成缓存键字符串
    #[must_use]
    pub fn build(&self) -> String {
        match self {
            Self::PollHistory {
                poll_interval_ms,
                config_ids,
            } => format!("{poll_interval_ms}:{}", join_ids(config_ids)),
            Self::Availability { config_ids } => format!("availability:{}", join_ids(config_ids)),
            Self::GroupInfo { group_name } => format!("group:{group_name}"),
        }
    }
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

/// ID 集合按字典序拼接，保证同一集合总是得到同一个键
fn join_ids(ids: &BTreeSet<String>) -> String {
    if ids.is_empty() {
        return EMPTY_ID_SET.to_string();
    }
    ids.iter().map(String::as_str).collect::<Vec<_>>().join("|")
}

/// 缓存键构建器
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    #[must_use]
    pub fn poll_history(poll_interval_ms: u64, config_ids: &BTreeSet<String>) -> String {
        CacheKey::PollHistory {
            poll_interval_ms,
            config_ids,
        }
        .build()
    }

    #[must_use]
    pub fn availability(config_ids: &BTreeSet<String>) -> String {
        CacheKey::Availability { config_ids }.build()
    }

    #[must_use]
    pub fn group_info(group_name: &str) -> String {
        CacheKey::GroupInfo { group_name }.build()
    }
}
