//! 上游服务客户端
//!
//! 文档库、股票行情、币价和链上钱包数据

pub mod alpha_vantage;    // Alpha Vantage 股票行情
pub mod blockchain;       // blockchain.info / Etherscan 链上数据
pub mod coin_market_cap;  // CoinMarketCap 币价
pub mod firestore;        // Firestore 文档库
pub mod wallet;           // 钱包聚合

pub use alpha_vantage::{AlphaVantageService, Timeframe};
pub use blockchain::{BlockchainService, CryptoType};
pub use coin_market_cap::CoinMarketCapService;
pub use firestore::{FirestoreClient, UpstreamResponse};
pub use wallet::WalletService;
