//! # 管理端处理器

pub mod dashboard;
pub mod metrics;
pub mod system;
