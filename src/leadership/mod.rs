//! # 轮询主节点选举模块
//!
//! 基于共享租约行的选主：同一时刻只有一个实例负责后台检测与写入历史

pub mod elector;
pub mod lease_store;
pub mod node;

pub use elector::{LEASE_DURATION, LEASE_RENEW_INTERVAL, LeaderElector, NodeRole};
pub use lease_store::{LeaseRecord, LeaseStore, MemoryLeaseStore, SeaOrmLeaseStore};
pub use node::{DEFAULT_NODE_ID, resolve_node_id};
