//! # 看板聚合
//!
//! 合并检测历史、维护状态与官方状态，生成分组排序后的只读视图

pub mod aggregator;
pub mod grouping;
pub mod types;

pub use aggregator::{DashboardAggregator, MAINTENANCE_MESSAGE};
pub use grouping::{UNGROUPED_DISPLAY_NAME, UNGROUPED_KEY, group_timelines, sort_by_name};
pub use types::{DashboardData, GroupedProviderTimelines, ProviderTimeline, RefreshMode};
