//! 记录类接口的请求体
//!
//! 缺失字段反序列化为空值，由各自的 `validate` 判断是否完整

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 数值字段：接受 JSON 数字或数字字符串，其他情况为 `None`
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

/// 支持 `yyyy-MM-dd` 与 `MM/dd/yyyy`
pub fn parse_expense_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

/// POST /api/expenses
#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
}

/// 校验通过的支出
#[derive(Debug, Clone, PartialEq)]
pub struct ValidExpense {
    pub date: String,
    pub parsed_date: NaiveDate,
    pub name: String,
    pub category: String,
    pub total: f64,
}

impl ExpenseRequest {
    pub fn validate(self) -> Option<ValidExpense> {
        let total = self.total?;
        if self.date.is_empty() || self.name.is_empty() || self.category.is_empty() {
            return None;
        }
        let parsed_date = parse_expense_date(&self.date)?;
        Some(ValidExpense {
            date: self.date,
            parsed_date,
            name: self.name,
            category: self.category,
            total,
        })
    }
}

/// POST /api/tax
#[derive(Debug, Deserialize)]
pub struct TaxRequest {
    #[serde(default)]
    pub result: String,
}

impl TaxRequest {
    pub fn validate(self) -> Option<String> {
        if self.result.is_empty() {
            None
        } else {
            Some(self.result)
        }
    }
}

/// POST /api/tips
#[derive(Debug, Deserialize)]
pub struct TipRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub text: String,
}

impl TipRequest {
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.category.is_empty() && !self.text.is_empty()
    }
}

/// POST /api/assets, /api/liabilities
#[derive(Debug, Deserialize)]
pub struct AssetLiabilityRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
}

impl AssetLiabilityRequest {
    pub fn validate(self) -> Option<(String, f64)> {
        let amount = self.amount?;
        if self.name.is_empty() {
            return None;
        }
        Some((self.name, amount))
    }
}

/// DELETE /api/expenses?docId=...
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(rename = "docId")]
    pub doc_id: Option<String>,
}

/// POST /api/wallet
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRequest {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub crypto_type: String,
}

impl WalletRequest {
    /// 三个字段都不能为空
    pub fn is_complete(&self) -> bool {
        !self.label.trim().is_empty()
            && !self.address.trim().is_empty()
            && !self.crypto_type.trim().is_empty()
    }
}

/// GET /api/wallet?type=BTC&address=...
#[derive(Debug, Default, Deserialize)]
pub struct WalletQuery {
    #[serde(rename = "type")]
    pub crypto_type: Option<String>,
    pub address: Option<String>,
}
