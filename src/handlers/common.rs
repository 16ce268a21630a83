//! 记录类接口共用的响应工具
//!
//! 文档库响应原样透传：成功时原始字节 + `application/json`，
//! 失败时只保留状态码

use actix_web::http::StatusCode;
use actix_web::{http::header::ContentType, HttpResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MarketDataError, StoreError};
use crate::models::{ApiResponse, UserSession};
use crate::services::{FirestoreClient, UpstreamResponse};

/// 上游状态码，无法识别时按 502 处理
pub fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// 只透传状态码，无响应体
pub fn passthrough_status(status: u16) -> HttpResponse {
    HttpResponse::build(upstream_status(status)).finish()
}

/// GET 透传
pub fn relay(response: UpstreamResponse) -> HttpResponse {
    if response.status == 200 {
        HttpResponse::Ok()
            .content_type(ContentType::json())
            .body(response.body)
    } else {
        log::warn!("文档库返回 HTTP {}", response.status);
        passthrough_status(response.status)
    }
}

/// 读取整个集合并透传
pub async fn list_collection(
    store: &FirestoreClient,
    session: &UserSession,
    collection: &str,
) -> Result<HttpResponse, StoreError> {
    log::info!("读取 {} 集合 (用户 {})", collection, session.local_id);
    Ok(relay(store.list(session, collection).await?))
}

/// 写入被接受时返回纯文本确认，否则透传状态码
pub fn write_result(accepted: bool, status: u16, message: &'static str) -> HttpResponse {
    if accepted {
        HttpResponse::Ok().content_type(ContentType::plaintext()).body(message)
    } else {
        log::error!("文档库写入失败: HTTP {}", status);
        passthrough_status(status)
    }
}

/// 解析请求体，格式错误时返回 `None`
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Option<T> {
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("请求体格式错误: {}", e);
            None
        }
    }
}

/// 行情类接口：结果包装为 `ApiResponse`，错误按类型映射状态码
pub fn market_response<T: Serialize>(result: Result<T, MarketDataError>) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::Ok().json(ApiResponse::success(data)),
        Err(e) => {
            log::error!("行情请求失败: {}", e);
            HttpResponse::build(e.status_code()).json(ApiResponse::<T>::error(e.to_string()))
        }
    }
}

pub fn bad_request() -> HttpResponse {
    HttpResponse::BadRequest().finish()
}

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().finish()
}
