//! Alpha Vantage 股票行情接口
//!
//! 对接 https://www.alphavantage.co/query
//! - GLOBAL_QUOTE：实时报价
//! - TIME_SERIES_DAILY / INTRADAY / WEEKLY：历史 K 线
//!
//! API Key 通过 `apikey` 查询参数传递；每次调用都直接请求数据源

use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde_json::{Map, Value};

use crate::config::{mask_key, ConfigManager};
use crate::error::MarketDataError;
use crate::models::{Stock, StockHistoryPoint};

type Result<T> = std::result::Result<T, MarketDataError>;

/// 历史数据时间范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
    OneYear,
}

impl Timeframe {
    /// 未知取值按 1M 处理
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "1D" => Self::OneDay,
            "1W" => Self::OneWeek,
            "3M" => Self::ThreeMonths,
            "1Y" => Self::OneYear,
            _ => Self::OneMonth,
        }
    }

    /// 数据源查询参数
    fn params(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            Self::OneDay => vec![
                ("function", "TIME_SERIES_INTRADAY"),
                ("interval", "5min"),
                ("outputsize", "full"),
            ],
            Self::OneWeek => vec![
                ("function", "TIME_SERIES_INTRADAY"),
                ("interval", "60min"),
                ("outputsize", "full"),
            ],
            Self::OneMonth | Self::ThreeMonths => vec![("function", "TIME_SERIES_DAILY")],
            Self::OneYear => vec![("function", "TIME_SERIES_WEEKLY")],
        }
    }

    /// 返回的数据点数量上限
    pub fn limit(&self) -> usize {
        match self {
            Self::OneDay => 78, // 6.5 小时的 5 分钟线
            Self::OneWeek => 5 * 7,
            Self::OneMonth => 30,
            Self::ThreeMonths => 90,
            Self::OneYear => 52,
        }
    }
}

/// 常见代码的公司名称
pub fn company_name(symbol: &str) -> String {
    let name = match symbol {
        "AAPL" => "Apple Inc.",
        "MSFT" => "Microsoft Corporation",
        "AMZN" => "Amazon.com Inc.",
        "GOOGL" => "Alphabet Inc.",
        "META" => "Meta Platforms Inc.",
        "TSLA" => "Tesla Inc.",
        "NVDA" => "NVIDIA Corporation",
        "JPM" => "JPMorgan Chase & Co.",
        "V" => "Visa Inc.",
        "JNJ" => "Johnson & Johnson",
        "WMT" => "Walmart Inc.",
        "PG" => "Procter & Gamble Co.",
        "MA" => "Mastercard Inc.",
        "UNH" => "UnitedHealth Group Inc.",
        "HD" => "Home Depot Inc.",
        other => return format!("{} Inc.", other),
    };
    name.to_string()
}

fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(MarketDataError::EmptySymbol);
    }
    Ok(symbol)
}

/// 数值字段，数据源以字符串返回；无法解析时为 0
fn field_f64(obj: &Map<String, Value>, key: &str) -> f64 {
    match obj.get(key) {
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn field_u64(obj: &Map<String, Value>, key: &str) -> u64 {
    match obj.get(key) {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

fn field_str(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// 识别数据源在 200 响应里返回的错误
pub fn check_vendor_errors(symbol: &str, json: &Value) -> Result<()> {
    if let Some(msg) = json.get("Error Message").and_then(Value::as_str) {
        return Err(MarketDataError::invalid_symbol(symbol, msg));
    }
    for key in ["Note", "Information"] {
        if let Some(msg) = json.get(key).and_then(Value::as_str) {
            let lower = msg.to_lowercase();
            if lower.contains("call frequency") || lower.contains("rate limit") {
                return Err(MarketDataError::RateLimited(msg.to_string()));
            }
        }
    }
    Ok(())
}

/// 解析 GLOBAL_QUOTE 响应
pub fn parse_global_quote(symbol: &str, json: &Value) -> Result<Stock> {
    check_vendor_errors(symbol, json)?;

    let quote = match json.get("Global Quote").and_then(Value::as_object) {
        Some(q) if !q.is_empty() => q,
        _ => {
            return Err(MarketDataError::invalid_symbol(
                symbol,
                "响应中没有报价数据",
            ))
        }
    };

    Ok(Stock {
        symbol: symbol.to_string(),
        name: company_name(symbol),
        exchange: String::new(),
        price: field_f64(quote, "05. price"),
        change: field_f64(quote, "09. change"),
        change_percent: field_f64(quote, "10. change percent"),
        volume: field_u64(quote, "06. volume"),
        open: field_f64(quote, "02. open"),
        high: field_f64(quote, "03. high"),
        low: field_f64(quote, "04. low"),
        previous_close: field_f64(quote, "08. previous close"),
        last_updated: field_str(quote, "07. latest trading day"),
    })
}

/// 解析 `yyyy-MM-dd HH:mm:ss` 或 `yyyy-MM-dd`（UTC）为毫秒时间戳
fn parse_series_timestamp(s: &str) -> Option<i64> {
    if s.contains(':') {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|dt| dt.and_utc().timestamp_millis())
    } else {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis())
    }
}

/// 解析任意 "Time Series" 响应，按数据源顺序（新到旧）取前 `limit` 条
pub fn parse_time_series(symbol: &str, json: &Value, limit: usize) -> Result<Vec<StockHistoryPoint>> {
    check_vendor_errors(symbol, json)?;

    let series = json
        .as_object()
        .and_then(|obj| {
            obj.iter()
                .find(|(key, _)| key.contains("Time Series"))
                .and_then(|(_, v)| v.as_object())
        })
        .ok_or_else(|| MarketDataError::Parse(format!("{} 的响应中没有时间序列", symbol)))?;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    let now = Utc::now().timestamp_millis();

    let points = series
        .iter()
        .take(limit)
        .enumerate()
        .filter_map(|(i, (time, point))| {
            let point = point.as_object()?;
            let timestamp = parse_series_timestamp(time).unwrap_or_else(|| {
                log::warn!("无法解析时间: {}", time);
                now - i as i64 * DAY_MS
            });
            // 日线字段带序号前缀，部分接口不带
            let (open, high, low, close, volume) = if point.contains_key("1. open") {
                ("1. open", "2. high", "3. low", "4. close", "5. volume")
            } else {
                ("open", "high", "low", "close", "volume")
            };
            Some(StockHistoryPoint {
                timestamp,
                price: field_f64(point, close),
                open: field_f64(point, open),
                high: field_f64(point, high),
                low: field_f64(point, low),
                volume: field_u64(point, volume),
            })
        })
        .collect();

    Ok(points)
}

/// Alpha Vantage 客户端
#[derive(Debug, Clone)]
pub struct AlphaVantageService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AlphaVantageService {
    pub fn new(client: Client, base_url: &str, keys: &ConfigManager) -> Self {
        let api_key = keys.alpha_vantage_api_key();
        match &api_key {
            Some(key) => log::info!("Alpha Vantage 已配置 API Key: {}", mask_key(key)),
            None => log::error!("未配置 Alpha Vantage API Key"),
        }
        Self {
            client,
            base_url: base_url.to_string(),
            api_key,
        }
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MarketDataError::MissingApiKey("Alpha Vantage"))?;

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", api_key)])
            .send()
            .await?;

        if response.status().as_u16() != 200 {
            log::error!("Alpha Vantage 返回 HTTP {}", response.status());
            return Err(MarketDataError::UpstreamStatus(response.status().as_u16()));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 获取实时报价
    pub async fn get_quote(&self, symbol: &str) -> Result<Stock> {
        let symbol = normalize_symbol(symbol)?;
        log::info!("获取 {} 实时报价", symbol);
        let json = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", &symbol)])
            .await?;
        parse_global_quote(&symbol, &json)
    }

    /// 获取日 K 线（compact，最近 100 条）
    pub async fn get_daily_series(&self, symbol: &str) -> Result<Vec<StockHistoryPoint>> {
        let symbol = normalize_symbol(symbol)?;
        log::info!("获取 {} 日K线", symbol);
        let json = self
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", &symbol),
                ("outputsize", "compact"),
            ])
            .await?;
        parse_time_series(&symbol, &json, usize::MAX)
    }

    /// 按时间范围获取历史数据
    pub async fn get_history(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<StockHistoryPoint>> {
        let symbol = normalize_symbol(symbol)?;
        log::info!("获取 {} 历史数据: {:?}", symbol, timeframe);
        let mut params: Vec<(&str, &str)> = timeframe.params();
        params.push(("symbol", &symbol));
        let json = self.query(&params).await?;
        parse_time_series(&symbol, &json, timeframe.limit())
    }

    /// 能取到报价即为有效代码
    pub async fn is_valid_symbol(&self, symbol: &str) -> bool {
        match self.get_quote(symbol).await {
            Ok(_) => true,
            Err(e) => {
                log::info!("代码 {} 校验失败: {}", symbol, e);
                false
            }
        }
    }
}
