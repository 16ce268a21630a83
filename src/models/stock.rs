//! 股票数据模型
//!
//! 定义股票相关的数据结构

use serde::{Deserialize, Serialize};

/// 股票实时行情
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    /// 股票代码
    pub symbol: String,
    /// 公司名称
    pub name: String,
    /// 交易所
    pub exchange: String,
    /// 当前价格
    pub price: f64,
    /// 涨跌额
    pub change: f64,
    /// 涨跌幅（百分比）
    pub change_percent: f64,
    /// 成交量
    pub volume: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// 昨收
    pub previous_close: f64,
    /// 最新交易日
    pub last_updated: String,
}

impl Stock {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }
}

/// 历史 K 线数据点
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StockHistoryPoint {
    /// UTC 毫秒时间戳
    pub timestamp: i64,
    /// 收盘价
    pub price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
}

/// 历史数据查询参数
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// 1D, 1W, 1M, 3M, 1Y
    pub timeframe: Option<String>,
}

/// 代码校验结果
#[derive(Debug, Serialize)]
pub struct SymbolValidity {
    pub symbol: String,
    pub valid: bool,
}
