//! # 看板读取处理器

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::dashboard::RefreshMode;
use crate::error::Result;
use crate::management::{response, server::AppState};

/// 看板查询参数
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// `always` / `missing` / `never`，缺省为 `missing`
    pub refresh: Option<String>,
}

/// 读取看板数据
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let mode = match query.refresh.as_deref().map(str::parse::<RefreshMode>).transpose() {
        Ok(mode) => mode.unwrap_or_default(),
        Err(message) => {
            return Ok(response::error(StatusCode::BAD_REQUEST, "INVALID_REFRESH_MODE", &message));
        }
    };

    let data = state.aggregator.load_dashboard_data(mode).await?;
    Ok(response::success(data))
}

/// 读取所有已启用 Provider 的可用性统计
pub async fn get_availability(State(state): State<AppState>) -> Result<Response> {
    let ids: BTreeSet<String> = state
        .configs
        .load_provider_configs()
        .await?
        .into_iter()
        .map(|config| config.id)
        .collect();

    let stats = state.availability.get_availability(&ids).await?;
    Ok(response::success(stats.as_ref()))
}

/// 读取分组展示信息
pub async fn get_group_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    match state.groups.get_group_info(&name).await? {
        Some(info) => Ok(response::success(info)),
        None => Ok(response::error(
            StatusCode::NOT_FOUND,
            "GROUP_NOT_FOUND",
            &format!("分组不存在: {name}"),
        )),
    }
}
