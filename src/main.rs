//! # Check CX 主程序

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use check_cx::{
    app::CoordinationContext,
    config::ConfigManager,
    database, lerror, linfo,
    logging::{self, LogComponent, LogStage},
    management::ManagementServer,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// 配置文件路径，缺省时按 CHECK_CX_CONFIG_PATH 与 RUST_ENV 查找
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 日志级别，RUST_LOG 优先
    #[arg(long, env = "CHECK_CX_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.log_level.as_deref());

    let config = ConfigManager::load(args.config.as_deref())
        .context("配置加载失败")?
        .get_config();

    let db = database::init_database(&config.database)
        .await
        .context("数据库连接失败")?;
    database::run_migrations(&db).await.context("数据库迁移失败")?;

    let context = CoordinationContext::build(Arc::clone(&config), Arc::new(db))
        .context("服务初始化失败")?;
    if let Err(e) = context.start_background().await {
        // 选主初始化失败时仍以只读节点提供服务
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "start_background",
            &format!("后台任务启动失败: {e}")
        );
    }

    let served = ManagementServer::new(Arc::clone(&context))
        .serve(shutdown_signal())
        .await;

    context.shutdown().await;
    served.context("管理端服务异常")?;

    linfo!("system", LogStage::Shutdown, LogComponent::Main, "service_shutdown", "服务正常关闭");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            lerror!("system", LogStage::Shutdown, LogComponent::Main, "signal", &format!("无法监听 Ctrl+C: {e}"));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                lerror!("system", LogStage::Shutdown, LogComponent::Main, "signal", &format!("无法监听 SIGTERM: {e}"));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    linfo!("system", LogStage::Shutdown, LogComponent::Main, "signal", "收到退出信号，开始关闭");
}
