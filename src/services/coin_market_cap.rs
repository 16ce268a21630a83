//! CoinMarketCap 币价接口
//!
//! GET /v1/cryptocurrency/quotes/latest?symbol=<SYM>&convert=USD
//! API Key 通过 `X-CMC_PRO_API_KEY` 请求头传递

use reqwest::Client;
use serde_json::Value;

use crate::config::{mask_key, ConfigManager};
use crate::error::MarketDataError;
use crate::models::CoinPrice;

const QUOTES_PATH: &str = "/v1/cryptocurrency/quotes/latest";

/// 从 quotes/latest 响应中提取 USD 报价
pub fn parse_quote(symbol: &str, json: &Value) -> Result<CoinPrice, MarketDataError> {
    let usd = &json["data"][symbol]["quote"]["USD"];
    if usd.is_null() {
        return Err(MarketDataError::invalid_symbol(symbol, "响应中没有 USD 报价"));
    }
    let current_price = usd["price"]
        .as_f64()
        .ok_or_else(|| MarketDataError::Parse(format!("{} 缺少 price 字段", symbol)))?;
    let price_change_percentage_24h = usd["percent_change_24h"]
        .as_f64()
        .ok_or_else(|| MarketDataError::Parse(format!("{} 缺少 percent_change_24h 字段", symbol)))?;

    Ok(CoinPrice {
        current_price,
        price_change_percentage_24h,
    })
}

#[derive(Debug, Clone)]
pub struct CoinMarketCapService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinMarketCapService {
    pub fn new(client: Client, base_url: &str, keys: &ConfigManager) -> Self {
        let api_key = keys.coin_market_cap_api_key();
        match &api_key {
            Some(key) => log::info!("CoinMarketCap 已配置 API Key: {}", mask_key(key)),
            None => log::error!("未配置 CoinMarketCap API Key"),
        }
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// 获取币价（USD）
    pub async fn get_price(&self, symbol: &str) -> Result<CoinPrice, MarketDataError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(MarketDataError::EmptySymbol);
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MarketDataError::MissingApiKey("CoinMarketCap"))?;

        log::info!("从 CoinMarketCap 获取 {} 报价", symbol);
        let response = self
            .client
            .get(format!("{}{}", self.base_url, QUOTES_PATH))
            .query(&[("symbol", symbol.as_str()), ("convert", "USD")])
            .header("X-CMC_PRO_API_KEY", api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            log::error!("CoinMarketCap 返回 HTTP {}: {}", status, text);
            return Err(MarketDataError::UpstreamStatus(status.as_u16()));
        }

        let json: Value = serde_json::from_str(&text)?;
        let price = parse_quote(&symbol, &json)?;
        log::info!(
            "{} 价格 {}（24h {}%）",
            symbol, price.current_price, price.price_change_percentage_24h
        );
        Ok(price)
    }

    /// 兼容旧的失败策略：任何错误都返回全零报价
    pub async fn get_price_or_default(&self, symbol: &str) -> CoinPrice {
        self.get_price(symbol).await.unwrap_or_else(|e| {
            log::error!("获取 {} 报价失败: {}", symbol, e);
            CoinPrice::default()
        })
    }
}
