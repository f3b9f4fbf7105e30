//! # 内部指标处理器

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use crate::management::server::AppState;
use crate::{linfo, lwarn, logging::{LogComponent, LogStage}};

/// 内部接口共享密钥请求头
pub const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

#[derive(Debug, Default, Deserialize)]
pub struct CacheMetricsQuery {
    /// 为 `1` 时先清零再返回
    pub reset: Option<String>,
}

/// 校验内部接口密钥，未配置密钥时放行
pub(crate) fn is_authorized(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected.filter(|token| !token.is_empty()) else {
        return true;
    };
    headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|provided| provided == expected)
}

/// 未授权响应
pub(crate) fn unauthorized(operation: &str) -> Response {
    lwarn!(
        "system",
        LogStage::Request,
        LogComponent::Metrics,
        operation,
        "内部接口密钥校验失败"
    );
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
}

/// 缓存命中统计
///
/// 返回未包装的报告对象，供运维脚本直接读取
pub async fn get_cache_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CacheMetricsQuery>,
) -> Response {
    if !is_authorized(state.config.metrics.token.as_deref(), &headers) {
        return unauthorized("cache_metrics");
    }

    if query.reset.as_deref() == Some("1") {
        state.metrics.reset_all();
        linfo!("system", LogStage::Request, LogComponent::Metrics, "cache_metrics_reset", "缓存统计已清零");
    }

    Json(state.metrics.report()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(INTERNAL_TOKEN_HEADER, HeaderValue::from_str(token).unwrap());
        headers
    }

    #[test]
    fn test_no_configured_token_allows_access() {
        assert!(is_authorized(None, &HeaderMap::new()));
        assert!(is_authorized(Some(""), &HeaderMap::new()));
    }

    #[test]
    fn test_token_must_match_exactly() {
        assert!(is_authorized(Some("s3cret"), &headers_with("s3cret")));
        assert!(!is_authorized(Some("s3cret"), &headers_with("S3CRET")));
        assert!(!is_authorized(Some("s3cret"), &HeaderMap::new()));
    }
}
