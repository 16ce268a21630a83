//! 链上钱包数据
//!
//! - BTC：blockchain.info `/rawaddr/{address}`
//! - ETH：Etherscan `module=account`（余额与交易列表），需要 API Key
//!
//! 只返回余额和最近交易，价格由 CoinMarketCap 提供

use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;

use crate::config::{mask_key, ConfigManager, MarketConfig};
use crate::error::MarketDataError;
use crate::models::Transaction;

type Result<T> = std::result::Result<T, MarketDataError>;

const SATOSHI_PER_BTC: f64 = 100_000_000.0;
const WEI_PER_ETH: f64 = 1e18;
/// 每个钱包保留的交易条数
pub const MAX_TRANSACTIONS: usize = 10;

/// 支持的币种
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoType {
    Btc,
    Eth,
}

impl CryptoType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BTC" => Some(Self::Btc),
            "ETH" => Some(Self::Eth),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Btc => "BTC",
            Self::Eth => "ETH",
        }
    }
}

/// 地址的链上状态
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChainSnapshot {
    pub balance: f64,
    pub transactions: Vec<Transaction>,
}

fn unknown_transaction() -> Transaction {
    Transaction {
        kind: "UNKNOWN".into(),
        amount: 0.0,
        timestamp: String::new(),
        tx_hash: String::new(),
        from: String::new(),
        to: String::new(),
        status: "UNKNOWN".into(),
    }
}

/// Unix 秒转 RFC 3339（UTC）
fn unix_to_rfc3339(secs: i64) -> String {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

/// 数值字段，Etherscan 以字符串返回
fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_bitcoin_transaction(tx: &Value, address: &str) -> Option<Transaction> {
    let outputs = tx.get("out")?.as_array()?;
    let first_to = outputs.first()?.get("addr").and_then(Value::as_str).unwrap_or_default();
    let satoshis: i64 = outputs.iter().filter_map(|o| o.get("value").and_then(as_i64)).sum();
    let from = tx["inputs"][0]["prev_out"]["addr"].as_str().unwrap_or_default();
    let confirmations = tx.get("confirmations").and_then(as_i64).unwrap_or(0);

    Some(Transaction {
        kind: if first_to == address { "RECEIVE" } else { "SEND" }.into(),
        amount: satoshis as f64 / SATOSHI_PER_BTC,
        timestamp: unix_to_rfc3339(tx.get("time").and_then(as_i64)?),
        tx_hash: tx.get("hash")?.as_str()?.to_string(),
        from: from.to_string(),
        to: first_to.to_string(),
        status: if confirmations > 6 { "CONFIRMED" } else { "PENDING" }.into(),
    })
}

/// 解析 `/rawaddr` 响应
pub fn parse_bitcoin_address(address: &str, json: &Value) -> Result<ChainSnapshot> {
    let satoshis = json
        .get("final_balance")
        .and_then(as_i64)
        .ok_or_else(|| MarketDataError::Parse(format!("{} 缺少 final_balance 字段", address)))?;

    let transactions = json
        .get("txs")
        .and_then(Value::as_array)
        .map(|txs| {
            txs.iter()
                .take(MAX_TRANSACTIONS)
                .map(|tx| {
                    parse_bitcoin_transaction(tx, address).unwrap_or_else(|| {
                        log::warn!("无法解析 BTC 交易: {}", tx);
                        unknown_transaction()
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ChainSnapshot {
        balance: satoshis as f64 / SATOSHI_PER_BTC,
        transactions,
    })
}

fn parse_ethereum_transaction(tx: &Value, address: &str) -> Option<Transaction> {
    let to = tx.get("to")?.as_str()?;
    let wei = tx.get("value").and_then(as_f64)?;
    let confirmations = tx.get("confirmations").and_then(as_i64).unwrap_or(0);

    Some(Transaction {
        kind: if to.eq_ignore_ascii_case(address) { "RECEIVE" } else { "SEND" }.into(),
        amount: wei / WEI_PER_ETH,
        timestamp: unix_to_rfc3339(tx.get("timeStamp").and_then(as_i64)?),
        tx_hash: tx.get("hash")?.as_str()?.to_string(),
        from: tx.get("from")?.as_str()?.to_string(),
        to: to.to_string(),
        status: if confirmations > 12 { "CONFIRMED" } else { "PENDING" }.into(),
    })
}

/// 检查 Etherscan 信封 `{status, message, result}`，成功时返回 `result`
///
/// `status == "0"` 且没有交易时不算错误，返回 `None`
pub fn check_etherscan(address: &str, json: &Value) -> Result<Option<Value>> {
    if json.get("status").and_then(Value::as_str) == Some("1") {
        return Ok(json.get("result").cloned());
    }
    let message = json.get("message").and_then(Value::as_str).unwrap_or_default();
    let result = json.get("result").and_then(Value::as_str).unwrap_or_default();
    let lower = result.to_lowercase();

    if message.starts_with("No transactions found") {
        Ok(None)
    } else if lower.contains("rate limit") {
        Err(MarketDataError::RateLimited(result.to_string()))
    } else if lower.contains("invalid address") {
        Err(MarketDataError::InvalidAddress(address.to_string()))
    } else {
        Err(MarketDataError::Vendor(format!("{} {}", message, result).trim().to_string()))
    }
}

/// 解析 `action=balance` 的 `result`（wei）
pub fn parse_wei_balance(result: &Value) -> Result<f64> {
    as_f64(result)
        .map(|wei| wei / WEI_PER_ETH)
        .ok_or_else(|| MarketDataError::Parse(format!("无效的余额: {}", result)))
}

/// 解析 `action=txlist` 的 `result`
pub fn parse_ethereum_transactions(address: &str, result: Option<&Value>) -> Vec<Transaction> {
    result
        .and_then(Value::as_array)
        .map(|txs| {
            txs.iter()
                .take(MAX_TRANSACTIONS)
                .map(|tx| {
                    parse_ethereum_transaction(tx, address).unwrap_or_else(|| {
                        log::warn!("无法解析 ETH 交易: {}", tx);
                        unknown_transaction()
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct BlockchainService {
    client: Client,
    blockchain_info_url: String,
    etherscan_url: String,
    etherscan_api_key: Option<String>,
}

impl BlockchainService {
    pub fn new(client: Client, market: &MarketConfig, keys: &ConfigManager) -> Self {
        let etherscan_api_key = keys.etherscan_api_key();
        match &etherscan_api_key {
            Some(key) => log::info!("Etherscan 已配置 API Key: {}", mask_key(key)),
            None => log::error!("未配置 Etherscan API Key"),
        }
        Self {
            client,
            blockchain_info_url: market.blockchain_info_url.trim_end_matches('/').to_string(),
            etherscan_url: market.etherscan_url.clone(),
            etherscan_api_key,
        }
    }

    /// 按币种查询地址
    pub async fn get_snapshot(&self, crypto: CryptoType, address: &str) -> Result<ChainSnapshot> {
        let address = address.trim();
        if address.is_empty() {
            return Err(MarketDataError::InvalidAddress(String::new()));
        }
        match crypto {
            CryptoType::Btc => self.get_bitcoin_snapshot(address).await,
            CryptoType::Eth => self.get_ethereum_snapshot(address).await,
        }
    }

    async fn get_bitcoin_snapshot(&self, address: &str) -> Result<ChainSnapshot> {
        log::info!("查询 BTC 地址 {}", address);
        let url = format!("{}/rawaddr/{}", self.blockchain_info_url, address);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        match status {
            200 => parse_bitcoin_address(address, &serde_json::from_str(&text)?),
            400 | 404 => Err(MarketDataError::InvalidAddress(address.to_string())),
            429 => Err(MarketDataError::RateLimited(text)),
            other => {
                log::error!("blockchain.info 返回 HTTP {}: {}", other, text);
                Err(MarketDataError::UpstreamStatus(other))
            }
        }
    }

    async fn etherscan(&self, address: &str, params: &[(&str, &str)]) -> Result<Option<Value>> {
        let api_key = self
            .etherscan_api_key
            .as_deref()
            .ok_or(MarketDataError::MissingApiKey("Etherscan"))?;

        let response = self
            .client
            .get(&self.etherscan_url)
            .query(&[("module", "account"), ("address", address)])
            .query(params)
            .query(&[("apikey", api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            log::error!("Etherscan 返回 HTTP {}", response.status());
            return Err(MarketDataError::UpstreamStatus(response.status().as_u16()));
        }
        let json: Value = serde_json::from_str(&response.text().await?)?;
        check_etherscan(address, &json)
    }

    async fn get_ethereum_snapshot(&self, address: &str) -> Result<ChainSnapshot> {
        log::info!("查询 ETH 地址 {}", address);
        let balance = match self
            .etherscan(address, &[("action", "balance"), ("tag", "latest")])
            .await?
        {
            Some(result) => parse_wei_balance(&result)?,
            None => 0.0,
        };

        let offset = MAX_TRANSACTIONS.to_string();
        let txs = self
            .etherscan(
                address,
                &[
                    ("action", "txlist"),
                    ("startblock", "0"),
                    ("endblock", "99999999"),
                    ("page", "1"),
                    ("offset", offset.as_str()),
                    ("sort", "desc"),
                ],
            )
            .await?;

        Ok(ChainSnapshot {
            balance,
            transactions: parse_ethereum_transactions(address, txs.as_ref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use std::collections::HashMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BTC_ADDR: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
    const ETH_ADDR: &str = "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae";

    fn service(base_url: &str, etherscan_key: Option<&str>) -> BlockchainService {
        let mut keys = Map::new();
        if let Some(k) = etherscan_key {
            keys.insert("etherscanApiKey".into(), json!(k));
        }
        let market = MarketConfig {
            blockchain_info_url: base_url.to_string(),
            etherscan_url: format!("{}/etherscan", base_url),
            ..MarketConfig::default()
        };
        BlockchainService::new(Client::new(), &market, &ConfigManager::from_parts(keys, HashMap::new()))
    }

    #[test]
    fn test_crypto_type_parse() {
        assert_eq!(CryptoType::parse(" btc "), Some(CryptoType::Btc));
        assert_eq!(CryptoType::parse("ETH"), Some(CryptoType::Eth));
        assert_eq!(CryptoType::parse("DOGE"), None);
    }

    #[test]
    fn test_parse_bitcoin_address() {
        let body = json!({
            "final_balance": 150_000_000i64,
            "txs": [
                {
                    "hash": "abc",
                    "time": 1_710_460_800,
                    "inputs": [{"prev_out": {"addr": "1Sender"}}],
                    "out": [{"addr": BTC_ADDR, "value": 50_000_000}, {"addr": "1Change", "value": 25_000_000}]
                },
                {"hash": "broken"}
            ]
        });
        let snap = parse_bitcoin_address(BTC_ADDR, &body).unwrap();
        assert_eq!(snap.balance, 1.5);
        assert_eq!(snap.transactions.len(), 2);

        let tx = &snap.transactions[0];
        assert_eq!(tx.kind, "RECEIVE");
        assert_eq!(tx.amount, 0.75);
        assert_eq!(tx.from, "1Sender");
        assert_eq!(tx.to, BTC_ADDR);
        assert_eq!(tx.status, "PENDING");
        assert_eq!(tx.timestamp, "2024-03-15T00:00:00+00:00");
        assert_eq!(snap.transactions[1].kind, "UNKNOWN");
    }

    #[test]
    fn test_etherscan_envelope() {
        let ok = json!({"status": "1", "message": "OK", "result": "2500000000000000000"});
        let result = check_etherscan(ETH_ADDR, &ok).unwrap().unwrap();
        assert_eq!(parse_wei_balance(&result).unwrap(), 2.5);

        let empty = json!({"status": "0", "message": "No transactions found", "result": []});
        assert_eq!(check_etherscan(ETH_ADDR, &empty).unwrap(), None);

        let limited = json!({"status": "0", "message": "NOTOK", "result": "Max rate limit reached"});
        assert!(matches!(
            check_etherscan(ETH_ADDR, &limited).unwrap_err(),
            MarketDataError::RateLimited(_)
        ));

        let bad_key = json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"});
        assert!(matches!(
            check_etherscan(ETH_ADDR, &bad_key).unwrap_err(),
            MarketDataError::Vendor(_)
        ));
    }

    #[test]
    fn test_parse_ethereum_transactions() {
        let result = json!([
            {
                "hash": "0x1", "from": "0xaaa", "to": ETH_ADDR.to_uppercase(),
                "value": "1000000000000000000", "timeStamp": "1710460800", "confirmations": "20"
            },
            {
                "hash": "0x2", "from": ETH_ADDR, "to": "0xbbb",
                "value": "500000000000000000", "timeStamp": "1710460800", "confirmations": "3"
            }
        ]);
        let txs = parse_ethereum_transactions(ETH_ADDR, Some(&result));
        assert_eq!(txs[0].kind, "RECEIVE");
        assert_eq!(txs[0].amount, 1.0);
        assert_eq!(txs[0].status, "CONFIRMED");
        assert_eq!(txs[1].kind, "SEND");
        assert_eq!(txs[1].status, "PENDING");
        assert!(parse_ethereum_transactions(ETH_ADDR, None).is_empty());
    }

    #[actix_web::test]
    async fn test_bitcoin_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/rawaddr/{}", BTC_ADDR)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"final_balance": 100_000_000, "txs": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rawaddr/nonsense"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid Bitcoin Address"))
            .mount(&server)
            .await;

        let svc = service(&server.uri(), None);
        let snap = svc.get_snapshot(CryptoType::Btc, BTC_ADDR).await.unwrap();
        assert_eq!(snap.balance, 1.0);
        assert!(matches!(
            svc.get_snapshot(CryptoType::Btc, "nonsense").await.unwrap_err(),
            MarketDataError::InvalidAddress(_)
        ));
        assert!(matches!(
            svc.get_snapshot(CryptoType::Btc, "  ").await.unwrap_err(),
            MarketDataError::InvalidAddress(_)
        ));
    }

    #[actix_web::test]
    async fn test_ethereum_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/etherscan"))
            .and(query_param("action", "balance"))
            .and(query_param("address", ETH_ADDR))
            .and(query_param("apikey", "eth-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1", "message": "OK", "result": "3000000000000000000"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/etherscan"))
            .and(query_param("action", "txlist"))
            .and(query_param("offset", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "0", "message": "No transactions found", "result": []
            })))
            .mount(&server)
            .await;

        let snap = service(&server.uri(), Some("eth-key"))
            .get_snapshot(CryptoType::Eth, ETH_ADDR)
            .await
            .unwrap();
        assert_eq!(snap.balance, 3.0);
        assert!(snap.transactions.is_empty());

        assert!(matches!(
            service(&server.uri(), None)
                .get_snapshot(CryptoType::Eth, ETH_ADDR)
                .await
                .unwrap_err(),
            MarketDataError::MissingApiKey(_)
        ));
    }
}
