//! # 管理服务器
//!
//! Axum HTTP服务器，提供看板读取与内部运维接口

use axum::Router;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::app::CoordinationContext;
use crate::error::{MonitorError, Result};
use crate::{linfo, logging::{LogComponent, LogStage}};

/// 管理服务器应用状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<CoordinationContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<CoordinationContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = CoordinationContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 管理服务器
pub struct ManagementServer {
    listen_addr: String,
    router: Router,
}

impl ManagementServer {
    #[must_use]
    pub fn new(context: Arc<CoordinationContext>) -> Self {
        let listen_addr = context.config.listen_addr();
        let router = Self::create_router(AppState::new(context));
        Self {
            listen_addr,
            router,
        }
    }

    /// 创建路由器
    pub fn create_router(state: AppState) -> Router {
        super::routes::create_routes(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// 监听并服务，`shutdown` 完成后优雅退出
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.listen_addr).await.map_err(|e| {
            MonitorError::network_with_source(format!("无法监听地址: {}", self.listen_addr), e)
        })?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Server,
            "server_start",
            &format!("管理端服务已启动: {}", self.listen_addr)
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| MonitorError::network_with_source("管理端服务异常退出", e))?;

        linfo!("system", LogStage::Shutdown, LogComponent::Server, "server_stop", "管理端服务已停止");
        Ok(())
    }
}
