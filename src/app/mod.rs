//! # 应用装配

pub mod context;

pub use context::CoordinationContext;
