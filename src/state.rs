//! 共享应用状态
//!
//! 启动时构造一次，通过 `web::Data<AppState>` 注入处理器。
//! 所有上游客户端共用同一个 `reqwest::Client` 连接池；
//! 配置和 API Key 只在构造时读取

use std::time::Duration;

use reqwest::Client;

use crate::config::{AppConfig, ConfigManager};
use crate::services::{
    AlphaVantageService, BlockchainService, CoinMarketCapService, FirestoreClient, WalletService,
};

#[derive(Clone)]
pub struct AppState {
    pub store: FirestoreClient,
    pub stocks: AlphaVantageService,
    pub crypto: CoinMarketCapService,
    pub wallets: WalletService,
}

impl AppState {
    pub fn new(config: &AppConfig, keys: &ConfigManager) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.api.connect_timeout_secs))
            .gzip(true)
            .build()?;

        let market = &config.market;
        let crypto = CoinMarketCapService::new(client.clone(), &market.coin_market_cap_url, keys);
        let chain = BlockchainService::new(client.clone(), market, keys);

        Ok(Self {
            store: FirestoreClient::new(client.clone(), &config.firestore),
            stocks: AlphaVantageService::new(client, &market.alpha_vantage_url, keys),
            wallets: WalletService::new(chain, crypto.clone()),
            crypto,
        })
    }

    /// 所有上游都指向同一个测试服务器
    #[cfg(test)]
    pub fn for_upstream(base_url: &str) -> Self {
        use serde_json::{json, Map};
        use std::collections::HashMap;

        let mut config = AppConfig::default();
        config.firestore.base_url = base_url.to_string();
        config.firestore.project_id = "cashclimb-test".to_string();
        config.market.alpha_vantage_url = format!("{}/query", base_url);
        config.market.coin_market_cap_url = base_url.to_string();
        config.market.blockchain_info_url = base_url.to_string();
        config.market.etherscan_url = format!("{}/etherscan", base_url);

        let mut keys = Map::new();
        keys.insert("alphaVantageApiKey".into(), json!("av-test-key"));
        keys.insert("coinMarketCapApiKey".into(), json!("cmc-test-key"));
        keys.insert("etherscanApiKey".into(), json!("eth-test-key"));

        Self::new(&config, &ConfigManager::from_parts(keys, HashMap::new()))
            .expect("构造测试状态失败")
    }
}
