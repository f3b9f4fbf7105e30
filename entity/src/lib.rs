//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod check_configs;
pub mod check_history;
pub mod group_info;
pub mod poller_lease;

pub use check_configs::Entity as CheckConfigs;
pub use check_history::Entity as CheckHistory;
pub use group_info::Entity as GroupInfo;
pub use poller_lease::Entity as PollerLease;
