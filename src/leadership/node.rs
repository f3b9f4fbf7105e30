//! 节点身份解析

use std::sync::Once;

use crate::{linfo, lwarn, logging::{LogComponent, LogStage}};

/// 无法获得任何身份信息时使用的节点 ID
pub const DEFAULT_NODE_ID: &str = "local";

static FALLBACK_WARNING: Once = Once::new();

/// 解析当前进程的节点 ID
///
/// 依次尝试显式配置、`HOSTNAME` 环境变量、操作系统主机名，最后回退到 [`DEFAULT_NODE_ID`]
#[must_use]
pub fn resolve_node_id(explicit: Option<&str>) -> String {
    resolve_from(
        explicit,
        std::env::var("HOSTNAME").ok(),
        sysinfo::System::host_name,
    )
}

fn resolve_from<F>(explicit: Option<&str>, hostname_env: Option<String>, os_host_name: F) -> String
where
    F: FnOnce() -> Option<String>,
{
    if let Some(id) = non_blank(explicit.map(str::to_string)) {
        return id;
    }

    let fallback = non_blank(hostname_env).or_else(|| non_blank(os_host_name()));
    let resolved = fallback.unwrap_or_else(|| DEFAULT_NODE_ID.to_string());

    FALLBACK_WARNING.call_once(|| {
        lwarn!(
            "system",
            LogStage::Startup,
            LogComponent::Leadership,
            "resolve_node_id",
            "未配置 CHECK_NODE_ID，使用回退节点 ID",
            node_id = %resolved
        );
    });
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Leadership,
        "resolve_node_id",
        "节点 ID 已确定",
        node_id = %resolved
    );
    resolved
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
