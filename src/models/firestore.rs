//! Firestore REST 文档格式
//!
//! 文档结构 `{"name": "...", "fields": {"字段": {"stringValue": "..."}}}`，
//! 字段按插入顺序序列化

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 字段集合（保序）
pub type Fields = IndexMap<String, FieldValue>;

/// 带类型包装的字段值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    StringValue(String),
    DoubleValue(f64),
    /// Firestore 以字符串传输 int64
    IntegerValue(String),
    BooleanValue(bool),
    TimestampValue(String),
    NullValue(()),
    ReferenceValue(String),
    /// base64 编码
    BytesValue(String),
    GeoPointValue(LatLng),
    MapValue(MapValue),
    ArrayValue(ArrayValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

impl FieldValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringValue(value.into())
    }

    pub fn integer(value: i64) -> Self {
        Self::IntegerValue(value.to_string())
    }

    pub fn map(fields: Fields) -> Self {
        Self::MapValue(MapValue { fields })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }

    /// 数值字段统一读为 f64（double 或 integer）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::DoubleValue(v) => Some(*v),
            Self::IntegerValue(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Self::MapValue(m) => Some(&m.fields),
            _ => None,
        }
    }
}

/// 单个文档
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// 完整资源路径，仅出现在读取结果中
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    pub fn new(fields: Fields) -> Self {
        Self { name: None, fields }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_f64)
    }
}

/// 集合读取结果，空集合时上游不返回 `documents`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocuments {
    #[serde(default)]
    pub documents: Vec<Document>,
}
