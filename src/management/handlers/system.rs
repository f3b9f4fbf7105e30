//! # 系统状态处理器

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Serialize;

use super::metrics::{is_authorized, unauthorized};
use crate::error::Result;
use crate::leadership::{LeaseRecord, NodeRole};
use crate::management::{response, server::AppState};
use crate::{lwarn, logging::{LogComponent, LogStage}};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfo {
    status: &'static str,
    version: &'static str,
    node_id: String,
    role: NodeRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadershipInfo {
    node_id: String,
    role: NodeRole,
    /// 数据库中的租约行，尚未初始化时为空
    lease: Option<LeaseRecord>,
}

/// 健康检查，数据库不可达时返回 503
pub async fn health_check(State(state): State<AppState>) -> Response {
    if let Err(e) = state.db.ping().await {
        lwarn!(
            "system",
            LogStage::Request,
            LogComponent::Server,
            "health_check",
            &format!("数据库不可达: {e}")
        );
        return response::error(
            StatusCode::SERVICE_UNAVAILABLE,
            "DATABASE_UNAVAILABLE",
            "数据库不可达",
        );
    }

    response::success(HealthInfo {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        node_id: state.elector.node_id().to_string(),
        role: state.elector.role(),
    })
}

/// 当前节点的选主状态
pub async fn get_leadership(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if !is_authorized(state.config.metrics.token.as_deref(), &headers) {
        return Ok(unauthorized("leadership"));
    }

    let lease = state.elector.current_lease().await?;
    Ok(response::success(LeadershipInfo {
        node_id: state.elector.node_id().to_string(),
        role: state.elector.role(),
        lease,
    }))
}
