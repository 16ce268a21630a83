//! 持仓相关的值类型：委托、持仓、成交

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Filled,
    Canceled,
}

/// 股票委托
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOrder {
    pub id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub quantity: u32,
    pub limit_price: f64,
    pub stop_price: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl StockOrder {
    /// 新建委托，状态为 open
    pub fn new(symbol: impl Into<String>, order_type: OrderType, side: OrderSide, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            order_type,
            side,
            quantity,
            limit_price: 0.0,
            stop_price: 0.0,
            status: OrderStatus::Open,
            created_at: Utc::now(),
        }
    }

    pub fn limit(symbol: impl Into<String>, side: OrderSide, quantity: u32, limit_price: f64) -> Self {
        Self {
            limit_price,
            ..Self::new(symbol, OrderType::Limit, side, quantity)
        }
    }

    pub fn stop(symbol: impl Into<String>, side: OrderSide, quantity: u32, stop_price: f64) -> Self {
        Self {
            stop_price,
            ..Self::new(symbol, OrderType::Stop, side, quantity)
        }
    }

    pub fn stop_limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u32,
        stop_price: f64,
        limit_price: f64,
    ) -> Self {
        Self {
            stop_price,
            limit_price,
            ..Self::new(symbol, OrderType::StopLimit, side, quantity)
        }
    }
}

/// 持仓
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPosition {
    pub symbol: String,
    pub quantity: u32,
    pub average_price: f64,
}

impl StockPosition {
    pub fn new(symbol: impl Into<String>, quantity: u32, average_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            average_price,
        }
    }
}

/// 成交记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: OrderSide,
    pub quantity: u32,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}
