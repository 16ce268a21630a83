//! HTTP 请求处理器
//!
//! 所有接口挂在 `/api` 下，除 `/api/health` 外都要求认证 Cookie

/// 以测试服务器为上游构造完整应用
#[cfg(test)]
macro_rules! test_app {
    ($upstream:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(
                    crate::state::AppState::for_upstream($upstream),
                ))
                .configure(crate::handlers::config),
        )
        .await
    };
}

pub mod assets_liabilities;
pub mod common;
pub mod crypto;
pub mod expenses;
pub mod health;
pub mod stock;
pub mod tax;
pub mod tips;
pub mod wallet;

use actix_web::web;

use crate::middleware::CookieAuth;

pub fn config(cfg: &mut web::ServiceConfig) {
    // 健康检查先于 /api scope 注册，不经过 Cookie 认证
    cfg.configure(health::config).service(
        web::scope("/api")
            .wrap(CookieAuth)
            .configure(expenses::config)
            .configure(tax::config)
            .configure(tips::config)
            .configure(assets_liabilities::config)
            .configure(stock::config)
            .configure(crypto::config)
            .configure(wallet::config),
    );
}
