//! # Check CX
//!
//! 多实例部署的 Provider 可用性监控：租约选主决定唯一的后台轮询节点，
//! 合并缓存约束检测频率，看板聚合历史、维护状态与官方状态。

pub mod app;
pub mod availability;
pub mod cache;
pub mod checks;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod error;
pub mod groups;
pub mod history;
pub mod leadership;
pub mod logging;
pub mod management;
pub mod official_status;
pub mod poller;
pub mod providers;
pub mod testing;
pub mod types;

pub use config::AppConfig;
pub use error::{MonitorError, Result};
