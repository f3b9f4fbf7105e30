//! # 共享领域类型
//!
//! 检测结果、Provider 配置与官方状态在各模块之间共享

pub mod check;
pub mod official;
pub mod provider;

pub use check::{CheckResult, CheckStatus, HistorySnapshot};
pub use official::{OfficialStatus, OfficialStatusLevel};
pub use provider::ProviderConfig;
