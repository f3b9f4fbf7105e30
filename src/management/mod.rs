//! # 管理API模块
//!
//! 看板读取、健康检查与内部运维接口

pub mod handlers;
pub mod response;
pub mod routes;
pub mod server;

pub use routes::create_routes;
pub use server::{AppState, ManagementServer};
