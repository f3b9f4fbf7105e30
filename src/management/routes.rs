//! # 路由配置

use crate::management::handlers::{dashboard, metrics, system};
use crate::management::server::AppState;
use axum::Router;
use axum::routing::get;

/// 创建所有路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(system::health_check))
        .nest("/api", api_routes())
        .with_state(state)
}

/// 看板读取路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/availability", get(dashboard::get_availability))
        .route("/groups/{name}", get(dashboard::get_group_info))
        .nest("/internal", internal_routes())
}

/// 内部运维路由
fn internal_routes() -> Router<AppState> {
    Router::new()
        .route("/cache-metrics", get(metrics::get_cache_metrics))
        .route("/leadership", get(system::get_leadership))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::CoordinationContext;
    use crate::app::context::Collaborators;
    use crate::cache::CacheMetricsRegistry;
    use crate::config::AppConfig;
    use crate::management::handlers::metrics::INTERNAL_TOKEN_HEADER;
    use crate::testing::{
        MemoryHistoryStore, ScriptedCheckRunner, StaticConfigStore, StaticOfficialStatus,
        create_test_db, provider_config,
    };
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use sea_orm::{ActiveModelTrait, Set};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app(token: Option<&str>) -> (Router, Arc<CoordinationContext>) {
        let mut config = AppConfig::default();
        config.node.id = Some("node-test".to_string());
        config.metrics.token = token.map(str::to_string);

        let db = create_test_db().await.unwrap();
        let collaborators = Collaborators {
            configs: Arc::new(StaticConfigStore::new(vec![provider_config(
                "p1",
                "Alpha",
                Some("core"),
            )])),
            history: Arc::new(MemoryHistoryStore::new()),
            checker: Arc::new(ScriptedCheckRunner::operational()),
            official: Arc::new(StaticOfficialStatus::new()),
        };
        let context = Arc::new(CoordinationContext::from_parts(
            Arc::new(config),
            db,
            CacheMetricsRegistry::new(),
            collaborators,
        ));
        (create_routes(AppState::new(Arc::clone(&context))), context)
    }

    async fn get(router: Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header(INTERNAL_TOKEN_HEADER, token);
        }
        let response = router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_node_identity() {
        let (router, _) = test_app(None).await;
        let (status, body) = get(router, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["nodeId"], "node-test");
        assert_eq!(body["data"]["role"], "standby");
    }

    #[tokio::test]
    async fn test_dashboard_refreshes_missing_history() {
        let (router, _) = test_app(None).await;

        let (status, body) = get(router.clone(), "/api/dashboard?refresh=never", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 0);

        let (status, body) = get(router, "/api/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["providerTimelines"][0]["id"], "p1");
        assert_eq!(body["data"]["groupedTimelines"][0]["groupName"], "core");
    }

    #[tokio::test]
    async fn test_dashboard_rejects_unknown_refresh_mode() {
        let (router, _) = test_app(None).await;
        let (status, body) = get(router, "/api/dashboard?refresh=sometimes", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_REFRESH_MODE");
    }

    #[tokio::test]
    async fn test_cache_metrics_requires_matching_token() {
        let (router, context) = test_app(Some("s3cret")).await;
        context.metrics.config.record_hit();

        let (status, body) = get(router.clone(), "/api/internal/cache-metrics", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "error": "unauthorized" }));
        assert_eq!(context.metrics.config.snapshot().hits, 1);

        let (status, body) =
            get(router.clone(), "/api/internal/cache-metrics?reset=1", Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(context.metrics.config.snapshot().hits, 1);

        let (status, body) = get(router, "/api/internal/cache-metrics", Some("s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["configCache"]["hits"], 1);
        assert_eq!(body["combinedDbCache"]["hits"], 1);
        assert!(body["generatedAt"].is_string());
    }

    #[tokio::test]
    async fn test_cache_metrics_reset_clears_counters() {
        let (router, context) = test_app(None).await;
        context.metrics.availability.record_miss();
        context.metrics.dashboard.record_hit();

        let (status, body) = get(router, "/api/internal/cache-metrics?reset=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["availabilityCache"]["misses"], 0);
        assert_eq!(body["dashboardCache"]["hits"], 0);
        assert_eq!(context.metrics.dashboard.snapshot().hits, 0);
    }

    #[tokio::test]
    async fn test_group_info_lookup() {
        let (router, context) = test_app(None).await;
        entity::group_info::ActiveModel {
            group_name: Set("core".to_string()),
            website_url: Set(Some("https://core.example".to_string())),
            description: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(context.db.as_ref())
        .await
        .unwrap();

        let (status, body) = get(router.clone(), "/api/groups/core", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["websiteUrl"], "https://core.example");

        let (status, body) = get(router, "/api/groups/absent", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "GROUP_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_availability_lists_enabled_providers() {
        let (router, _) = test_app(None).await;
        let (status, body) = get(router, "/api/availability", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["configId"], "p1");
        assert_eq!(body["data"][0]["stats"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_leadership_after_election() {
        let (router, context) = test_app(None).await;
        context.elector.ensure_leadership().await.unwrap();

        let (status, body) = get(router, "/api/internal/leadership", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["nodeId"], "node-test");
        assert_eq!(body["data"]["role"], "leader");
        assert_eq!(body["data"]["lease"]["holderNodeId"], "node-test");

        context.elector.stop().await;
    }
}
