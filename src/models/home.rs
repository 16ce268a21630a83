//! 首页看板数据

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeData {
    pub net_worth: i64,
    pub net_worth_breakdown: HashMap<String, i64>,
    pub total_income: i64,
    pub total_income_breakdown: HashMap<String, i64>,
    pub total_expenses: i64,
    pub total_investments: i64,
    pub bills_due: u32,
    pub monthly_incomes: Vec<i64>,
    pub monthly_expenses: Vec<i64>,
    pub monthly_stock_values: Vec<i64>,
}
