//! 钱包聚合：链上余额和交易 + CoinMarketCap 币价

use crate::error::MarketDataError;
use crate::models::{CoinPrice, WalletInfo};
use crate::services::blockchain::{BlockchainService, CryptoType};
use crate::services::CoinMarketCapService;

#[derive(Debug, Clone)]
pub struct WalletService {
    chain: BlockchainService,
    prices: CoinMarketCapService,
}

impl WalletService {
    pub fn new(chain: BlockchainService, prices: CoinMarketCapService) -> Self {
        Self { chain, prices }
    }

    /// 只查币价
    pub async fn get_price_info(&self, crypto: CryptoType) -> Result<CoinPrice, MarketDataError> {
        self.prices.get_price(crypto.symbol()).await
    }

    /// 地址的完整快照，任一数据源失败即返回错误
    pub async fn get_wallet_info(
        &self,
        address: &str,
        crypto: CryptoType,
    ) -> Result<WalletInfo, MarketDataError> {
        let snapshot = self.chain.get_snapshot(crypto, address).await?;
        let price = self.get_price_info(crypto).await?;
        log::info!(
            "{} 钱包 {}: 余额 {}，{} 笔交易",
            crypto.symbol(),
            address,
            snapshot.balance,
            snapshot.transactions.len()
        );
        Ok(WalletInfo {
            balance: snapshot.balance,
            transactions: snapshot.transactions,
            current_price: price.current_price,
            price_change_24h: price.price_change_percentage_24h,
        })
    }
}
