//! CashClimb 后端服务
//!
//! 个人理财应用的 HTTP 代理：按用户把支出、税务、建议、资产负债记录
//! 转发到 Firestore，并提供股票与加密货币行情查询

mod config;     // 配置加载与 API Key 管理
mod error;      // 错误类型
mod handlers;   // HTTP 请求处理器
mod middleware; // 中间件
mod models;     // 数据模型定义
mod services;   // 上游服务客户端
mod state;      // 共享应用状态

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use std::env;

use crate::config::{AppConfig, ConfigManager};
use crate::state::AppState;

/// 命令行第一个参数可覆盖端口，无效时忽略
fn port_override(arg: Option<String>) -> Result<Option<u16>, String> {
    match arg {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| raw),
    }
}

/// 应用程序入口
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load();

    // 初始化日志系统，RUST_LOG 优先于配置文件
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));

    match &config.source {
        Some(path) => log::info!("从 {} 加载配置", path),
        None => log::warn!("未找到配置文件，使用默认配置"),
    }

    match port_override(env::args().nth(1)) {
        Ok(Some(port)) => config.server.port = port,
        Ok(None) => {}
        Err(raw) => log::warn!("无效的端口参数 {}，使用 {}", raw, config.server.port),
    }

    let keys = ConfigManager::load(&config.secrets.keys_file);
    let bind_addr = config.bind_addr();
    let workers = config.server.workers;

    let state = AppState::new(&config, &keys)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let state = web::Data::new(state);

    log::info!("启动 CashClimb 后端服务，监听 {}", bind_addr);

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())  // 请求日志
            .app_data(state.clone())
            .configure(handlers::config)  // 配置路由
    });
    if workers > 0 {
        server = server.workers(workers);
    }

    server.bind(&bind_addr)?.run().await
}
