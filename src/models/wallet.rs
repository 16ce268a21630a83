//! 加密货币钱包模型
//!
//! 钱包保存在 `Users/{localId}/Wallets/{id}`，交易以 `arrayValue` 存储

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::firestore::{ArrayValue, Document, FieldValue, Fields};

/// 单笔链上交易（不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// SEND, RECEIVE, UNKNOWN
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub timestamp: String,
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    /// CONFIRMED, PENDING, UNKNOWN
    pub status: String,
}

/// 钱包快照：余额、交易和行情
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub balance: f64,
    pub transactions: Vec<Transaction>,
    pub current_price: f64,
    pub price_change_24h: f64,
}

/// 币价
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinPrice {
    pub current_price: f64,
    pub price_change_percentage_24h: f64,
}

/// 钱包
///
/// `id` 在构造时生成，之后不再变化
#[derive(Debug, Clone)]
pub struct Wallet {
    id: String,
    label: String,
    address: String,
    crypto_type: String,
    balance: f64,
    value: f64,
    change_24h: f64,
    last_updated: String,
    transactions: Vec<Transaction>,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

impl Wallet {
    pub fn new(label: impl Into<String>, address: impl Into<String>, crypto_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            address: address.into(),
            crypto_type: crypto_type.into(),
            balance: 0.0,
            value: 0.0,
            change_24h: 0.0,
            last_updated: now_iso(),
            transactions: Vec::new(),
        }
    }

    /// 用最新快照整体覆盖余额、市值、交易和更新时间
    pub fn update_info(&mut self, info: WalletInfo) {
        self.balance = info.balance;
        self.value = info.balance * info.current_price;
        self.change_24h = info.price_change_24h;
        self.transactions = info.transactions;
        self.last_updated = now_iso();
    }

    /// 对外 JSON，只带最近一笔交易
    pub fn to_json(&self) -> Value {
        let mut json = json!({
            "id": self.id,
            "label": self.label,
            "address": self.address,
            "cryptoType": self.crypto_type,
            "balance": self.balance,
            "value": self.value,
            "change24h": self.change_24h,
            "lastUpdated": self.last_updated,
        });
        if let (Some(tx), Some(obj)) = (self.transactions.first(), json.as_object_mut()) {
            obj.insert("lastTransaction".to_string(), json!(tx));
        }
        json
    }

    /// 转为文档库格式
    pub fn to_document(&self) -> Document {
        let transactions = self
            .transactions
            .iter()
            .map(|tx| {
                let mut f = Fields::new();
                f.insert("type".into(), FieldValue::string(&tx.kind));
                f.insert("amount".into(), FieldValue::DoubleValue(tx.amount));
                f.insert("timestamp".into(), FieldValue::string(&tx.timestamp));
                f.insert("txHash".into(), FieldValue::string(&tx.tx_hash));
                f.insert("from".into(), FieldValue::string(&tx.from));
                f.insert("to".into(), FieldValue::string(&tx.to));
                f.insert("status".into(), FieldValue::string(&tx.status));
                FieldValue::map(f)
            })
            .collect();

        let mut fields = Fields::new();
        fields.insert("id".into(), FieldValue::string(&self.id));
        fields.insert("label".into(), FieldValue::string(&self.label));
        fields.insert("address".into(), FieldValue::string(&self.address));
        fields.insert("cryptoType".into(), FieldValue::string(&self.crypto_type));
        fields.insert("balance".into(), FieldValue::DoubleValue(self.balance));
        fields.insert("value".into(), FieldValue::DoubleValue(self.value));
        fields.insert("change24h".into(), FieldValue::DoubleValue(self.change_24h));
        fields.insert("lastUpdated".into(), FieldValue::string(&self.last_updated));
        fields.insert(
            "transactions".into(),
            FieldValue::ArrayValue(ArrayValue { values: transactions }),
        );
        Document::new(fields)
    }

    /// 从文档恢复；缺少地址或币种时返回 `None`
    ///
    /// `id` 字段缺失时取文档名的最后一段
    pub fn from_document(doc: &Document) -> Option<Self> {
        let id = doc
            .get_str("id")
            .map(str::to_string)
            .or_else(|| doc.name.as_deref()?.rsplit('/').next().map(str::to_string))?;
        let text = |key: &str| doc.get_str(key).unwrap_or_default().to_string();

        let transactions = match doc.get("transactions") {
            Some(FieldValue::ArrayValue(array)) => array
                .values
                .iter()
                .filter_map(FieldValue::as_map)
                .map(|f| {
                    let s = |key: &str| f.get(key).and_then(FieldValue::as_str).unwrap_or_default().to_string();
                    Transaction {
                        kind: s("type"),
                        amount: f.get("amount").and_then(FieldValue::as_f64).unwrap_or(0.0),
                        timestamp: s("timestamp"),
                        tx_hash: s("txHash"),
                        from: s("from"),
                        to: s("to"),
                        status: s("status"),
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            id,
            label: text("label"),
            address: doc.get_str("address")?.to_string(),
            crypto_type: doc.get_str("cryptoType")?.to_string(),
            balance: doc.get_f64("balance").unwrap_or(0.0),
            value: doc.get_f64("value").unwrap_or(0.0),
            change_24h: doc.get_f64("change24h").unwrap_or(0.0),
            last_updated: text("lastUpdated"),
            transactions,
        })
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn address(&self) -> &str { &self.address }
    pub fn crypto_type(&self) -> &str { &self.crypto_type }
}
