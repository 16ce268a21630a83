//! 错误类型
//!
//! - `StoreError`：调用 Firestore 失败（地址、网络、读取状态或解析），对外统一 500 空响应
//! - `MarketDataError`：行情数据源失败，由处理器映射为状态码

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("无效的上游地址: {0}")]
    Url(#[from] url::ParseError),

    #[error("上游请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("读取文档返回 HTTP {0}")]
    ReadStatus(u16),

    #[error("无法解析文档: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        log::error!("文档库调用失败: {}", self);
        HttpResponse::build(self.status_code()).finish()
    }
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("未配置 {0} API Key")]
    MissingApiKey(&'static str),

    #[error("代码不能为空")]
    EmptySymbol,

    #[error("无效的钱包地址: {0}")]
    InvalidAddress(String),

    #[error("无效的代码 {symbol}: {message}")]
    InvalidSymbol { symbol: String, message: String },

    #[error("数据源限流: {0}")]
    RateLimited(String),

    #[error("数据源返回 HTTP {0}")]
    UpstreamStatus(u16),

    #[error("数据源返回错误: {0}")]
    Vendor(String),

    #[error("请求数据源失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("解析数据源响应失败: {0}")]
    Parse(String),
}

impl MarketDataError {
    pub fn invalid_symbol(symbol: &str, message: impl Into<String>) -> Self {
        Self::InvalidSymbol {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingApiKey(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::EmptySymbol | Self::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSymbol { .. } => StatusCode::NOT_FOUND,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamStatus(_) | Self::Vendor(_) | Self::Http(_) | Self::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl From<serde_json::Error> for MarketDataError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
