//! 支出记录
//!
//! - GET    /api/expenses           读取 `Expenses` 集合
//! - POST   /api/expenses           新增一条支出，并更新月度汇总
//! - DELETE /api/expenses?docId=..  删除一条支出，并扣减月度汇总
//!
//! 月度汇总位于 `Summaries/expense_<YYYY_MM>`，更新失败只记日志

use actix_web::{web, HttpResponse};
use chrono::{Datelike, NaiveDate, Utc};
use uuid::Uuid;

use super::common::{bad_request, list_collection, method_not_allowed, parse_body, passthrough_status, write_result};
use crate::error::StoreError;
use crate::models::{parse_expense_date, DeleteQuery, Document, ExpenseRequest, FieldValue, Fields, UserSession, ValidExpense};
use crate::services::FirestoreClient;
use crate::state::AppState;

const EXPENSES: &str = "Expenses";
const SUMMARIES: &str = "Summaries";

/// `YYYY_MM`
fn year_month(date: NaiveDate) -> String {
    format!("{:04}_{:02}", date.year(), date.month())
}

/// `exp_<毫秒>_<0..1000>`
fn transaction_id(now_millis: i64, doc_id: &Uuid) -> String {
    format!("exp_{}_{}", now_millis, doc_id.as_u128() % 1000)
}

fn expense_fields(expense: &ValidExpense, now_millis: i64, doc_id: &Uuid) -> Fields {
    let mut fields = Fields::new();
    fields.insert("date".into(), FieldValue::string(&expense.date));
    fields.insert("name".into(), FieldValue::string(&expense.name));
    fields.insert("category".into(), FieldValue::string(&expense.category));
    fields.insert("total".into(), FieldValue::DoubleValue(expense.total));
    fields.insert("yearMonth".into(), FieldValue::string(year_month(expense.parsed_date)));
    fields.insert("year".into(), FieldValue::string(expense.parsed_date.year().to_string()));
    fields.insert("transactionId".into(), FieldValue::string(transaction_id(now_millis, doc_id)));
    fields.insert("createdAt".into(), FieldValue::integer(now_millis));
    fields.insert("updatedAt".into(), FieldValue::integer(now_millis));
    fields
}

/// 在已有汇总上累加一笔金额（删除时为负数）
///
/// 数量随金额正负加一或减一，不低于 0；分类金额不低于 0
fn apply_to_summary(
    existing: Option<&Document>,
    date: NaiveDate,
    amount: f64,
    category: &str,
    now_millis: i64,
) -> Document {
    let total = existing.and_then(|d| d.get_f64("totalExpense")).unwrap_or(0.0);
    let count = existing
        .and_then(|d| d.get_f64("expenseCount"))
        .map(|c| c as i64)
        .unwrap_or(0);

    let mut categories = Fields::new();
    if let Some(map) = existing.and_then(|d| d.get("categories")).and_then(FieldValue::as_map) {
        for (name, value) in map {
            if let Some(v) = value.as_f64() {
                categories.insert(name.clone(), FieldValue::DoubleValue(v));
            }
        }
    }
    let category_total = categories.get(category).and_then(FieldValue::as_f64).unwrap_or(0.0) + amount;
    categories.insert(category.to_string(), FieldValue::DoubleValue(category_total.max(0.0)));

    let new_count = if amount > 0.0 { count + 1 } else { (count - 1).max(0) };

    let mut fields = Fields::new();
    fields.insert("totalExpense".into(), FieldValue::DoubleValue(total + amount));
    fields.insert("expenseCount".into(), FieldValue::integer(new_count));
    fields.insert("categories".into(), FieldValue::map(categories));
    fields.insert("yearMonth".into(), FieldValue::string(year_month(date)));
    fields.insert("year".into(), FieldValue::string(date.year().to_string()));
    fields.insert("month".into(), FieldValue::integer(i64::from(date.month())));
    fields.insert("lastUpdated".into(), FieldValue::integer(now_millis));
    match existing.and_then(|d| d.get("createdAt")) {
        Some(created) => fields.insert("createdAt".into(), created.clone()),
        None => fields.insert("createdAt".into(), FieldValue::integer(now_millis)),
    };
    Document::new(fields)
}

/// 读-改-写月度汇总，失败只记日志
///
/// 读取失败时不写入，已有汇总不会被从零覆盖
async fn update_monthly_summary(
    store: &FirestoreClient,
    session: &UserSession,
    date: NaiveDate,
    amount: f64,
    category: &str,
) {
    let summary_id = format!("expense_{}", year_month(date));
    let result: Result<(), StoreError> = async {
        let existing = store.fetch_document(session, SUMMARIES, &summary_id).await?;
        let summary = apply_to_summary(existing.as_ref(), date, amount, category, Utc::now().timestamp_millis());
        let response = store.patch(session, SUMMARIES, &summary_id, &summary).await?;
        if !response.is_success() {
            log::error!("写入月度汇总 {} 失败: HTTP {}", summary_id, response.status);
        } else {
            log::info!("月度汇总 {} 已更新", summary_id);
        }
        Ok(())
    }
    .await;

    if let Err(e) = result {
        log::error!("更新月度汇总 {} 失败: {}", summary_id, e);
    }
}

async fn list_expenses(state: web::Data<AppState>, session: UserSession) -> Result<HttpResponse, StoreError> {
    list_collection(&state.store, &session, EXPENSES).await
}

async fn add_expense(
    state: web::Data<AppState>,
    session: UserSession,
    body: web::Bytes,
) -> Result<HttpResponse, StoreError> {
    let Some(expense) = parse_body::<ExpenseRequest>(&body).and_then(ExpenseRequest::validate) else {
        log::warn!("支出字段缺失或格式错误");
        return Ok(bad_request());
    };

    let doc_id = Uuid::new_v4();
    let now = Utc::now().timestamp_millis();
    let document = Document::new(expense_fields(&expense, now, &doc_id));
    log::info!("新增支出 {} ({} {})", doc_id, expense.category, expense.total);

    let response = state
        .store
        .patch(&session, EXPENSES, &doc_id.to_string(), &document)
        .await?;
    if response.is_success() {
        update_monthly_summary(&state.store, &session, expense.parsed_date, expense.total, &expense.category).await;
    }
    Ok(write_result(response.is_success(), response.status, "Expense added successfully."))
}

async fn delete_expense(
    state: web::Data<AppState>,
    session: UserSession,
    query: web::Query<DeleteQuery>,
) -> Result<HttpResponse, StoreError> {
    let Some(doc_id) = query.into_inner().doc_id.filter(|id| !id.is_empty()) else {
        log::warn!("删除支出缺少 docId");
        return Ok(bad_request());
    };

    // 删除前读取金额与日期；不存在直接 404，读取失败不影响删除
    let existing = match state.store.fetch_document(&session, EXPENSES, &doc_id).await {
        Ok(Some(doc)) => Some(doc),
        Ok(None) => {
            log::warn!("支出 {} 不存在", doc_id);
            return Ok(HttpResponse::NotFound().finish());
        }
        Err(e) => {
            log::warn!("读取支出 {} 失败: {}", doc_id, e);
            None
        }
    };

    log::info!("删除支出 {}", doc_id);
    let response = state.store.delete(&session, EXPENSES, &doc_id).await?;
    if response.status != 200 && response.status != 204 {
        log::error!("删除支出 {} 失败: HTTP {}", doc_id, response.status);
        return Ok(passthrough_status(response.status));
    }

    if let Some(doc) = existing {
        let date = doc.get_str("date").and_then(parse_expense_date);
        let total = doc.get_f64("total").unwrap_or(0.0);
        let category = doc.get_str("category").unwrap_or_default();
        if let Some(date) = date.filter(|_| total > 0.0) {
            update_monthly_summary(&state.store, &session, date, -total, category).await;
        }
    }
    Ok(HttpResponse::Ok().finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/expenses")
            .route(web::get().to(list_expenses))
            .route(web::post().to(add_expense))
            .route(web::delete().to(delete_expense))
            .default_service(web::to(method_not_allowed)),
    );
}
