//! 配置模块
//!
//! - `AppConfig`：服务配置，从 JSON 文件加载，缺失时使用默认值
//! - `ConfigManager`：API Key 查找，环境变量优先，其次是本地 keys.json

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "CASHCLIMB_";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 出站 HTTP 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Firestore 文档库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    /// REST 根地址
    #[serde(default = "default_firestore_url")]
    pub base_url: String,
    /// 项目 ID
    #[serde(default = "default_project_id")]
    pub project_id: String,
}

/// 行情数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_alpha_vantage_url")]
    pub alpha_vantage_url: String,
    #[serde(default = "default_coin_market_cap_url")]
    pub coin_market_cap_url: String,
    /// 比特币地址查询
    #[serde(default = "default_blockchain_info_url")]
    pub blockchain_info_url: String,
    /// 以太坊地址查询
    #[serde(default = "default_etherscan_url")]
    pub etherscan_url: String,
}

/// 密钥文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// keys.json 路径
    #[serde(default = "default_keys_file")]
    pub keys_file: String,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub firestore: FirestoreConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    /// 配置来源（文件路径），默认配置时为空
    #[serde(skip)]
    pub source: Option<String>,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_connect_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_firestore_url() -> String { "https://firestore.googleapis.com".to_string() }
fn default_project_id() -> String { "cashclimb-d162c".to_string() }
fn default_alpha_vantage_url() -> String { "https://www.alphavantage.co/query".to_string() }
fn default_coin_market_cap_url() -> String { "https://pro-api.coinmarketcap.com".to_string() }
fn default_blockchain_info_url() -> String { "https://blockchain.info".to_string() }
fn default_etherscan_url() -> String { "https://api.etherscan.io/api".to_string() }
fn default_keys_file() -> String { "keys.json".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_firestore_url(),
            project_id: default_project_id(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            alpha_vantage_url: default_alpha_vantage_url(),
            coin_market_cap_url: default_coin_market_cap_url(),
            blockchain_info_url: default_blockchain_info_url(),
            etherscan_url: default_etherscan_url(),
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            keys_file: default_keys_file(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            log: LogConfig::default(),
            firestore: FirestoreConfig::default(),
            market: MarketConfig::default(),
            secrets: SecretsConfig::default(),
            source: None,
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值
    ///
    /// 在日志系统初始化之前调用，所以这里不打日志，
    /// 来源记录在 `source` 中，由调用方输出
    pub fn load() -> Self {
        let config_paths = ["config.json", "config/config.json"];

        for path in config_paths {
            if Path::new(path).exists() {
                if let Ok(mut config) = Self::from_file(path) {
                    config.source = Some(path.to_string());
                    return config;
                }
            }
        }

        Self::default()
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// API Key 管理器
///
/// 启动时构造一次，之后只读。查找顺序：
/// 1. 环境变量 `CASHCLIMB_<NAME>`
/// 2. keys.json 中的同名键
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    keys: Map<String, Value>,
    /// 测试用的环境变量覆盖，非空时替代进程环境
    env: Option<HashMap<String, String>>,
}

impl ConfigManager {
    /// 从 keys.json 加载
    ///
    /// 文件缺失或格式错误时记录日志，退化为只读环境变量
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::read_keys(path) {
            Ok(keys) => {
                log::info!("从 {} 加载 {} 个密钥配置", path.display(), keys.len());
                Self { keys, env: None }
            }
            Err(e) => {
                log::error!("加载密钥文件 {} 失败: {}，仅使用环境变量", path.display(), e);
                Self::default()
            }
        }
    }

    fn read_keys(path: &Path) -> anyhow::Result<Map<String, Value>> {
        let content = fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow::anyhow!("密钥文件顶层必须是 JSON 对象")),
        }
    }

    /// 用内存中的键值构造，`env` 替代进程环境变量
    pub fn from_parts(keys: Map<String, Value>, env: HashMap<String, String>) -> Self {
        Self {
            keys,
            env: Some(env),
        }
    }

    /// 配置项名称对应的环境变量名
    ///
    /// `alphaVantageApiKey` -> `CASHCLIMB_ALPHAVANTAGEAPIKEY`
    /// `alphavantage.timeout` -> `CASHCLIMB_ALPHAVANTAGE_TIMEOUT`
    pub fn env_var_name(name: &str) -> String {
        let transformed: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", ENV_PREFIX, transformed)
    }

    fn env_lookup(&self, var: &str) -> Option<String> {
        let value = match &self.env {
            Some(env) => env.get(var).cloned(),
            None => std::env::var(var).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// 获取 API Key
    pub fn get_api_key(&self, name: &str) -> Option<String> {
        let var = Self::env_var_name(name);
        if let Some(value) = self.env_lookup(&var) {
            log::debug!("配置项 {} 来自环境变量 {}", name, var);
            return Some(value);
        }

        let value = match self.keys.get(name) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };

        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => {
                log::debug!("配置项 {} 来自密钥文件", name);
                Some(v)
            }
            None => {
                log::warn!("未找到配置项: {}", name);
                None
            }
        }
    }

    /// 获取配置值，缺失时返回默认值
    pub fn get_config_value(&self, name: &str, default: &str) -> String {
        self.get_api_key(name).unwrap_or_else(|| default.to_string())
    }

    /// 获取整数配置值，缺失或解析失败时返回默认值
    pub fn get_config_value_as_int(&self, name: &str, default: i64) -> i64 {
        match self.get_api_key(name) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("配置项 {} 不是整数: {}，使用默认值 {}", name, raw, default);
                default
            }),
            None => default,
        }
    }

    pub fn alpha_vantage_api_key(&self) -> Option<String> {
        self.get_api_key("alphaVantageApiKey")
    }

    pub fn coin_market_cap_api_key(&self) -> Option<String> {
        self.get_api_key("coinMarketCapApiKey")
    }

    pub fn etherscan_api_key(&self) -> Option<String> {
        self.get_api_key("etherscanApiKey")
    }
}

/// 日志中展示密钥时只保留前 4 位
pub fn mask_key(key: &str) -> String {
    if key.chars().count() > 4 {
        format!("{}...", key.chars().take(4).collect::<String>())
    } else {
        "****".to_string()
    }
}
