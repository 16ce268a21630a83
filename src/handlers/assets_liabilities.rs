//! 资产与负债
//!
//! 两个集合结构相同：`{name, amount}`，文档 ID 由名称生成，
//! 同名记录会覆盖

use std::sync::OnceLock;

use actix_web::{web, HttpResponse};
use regex::Regex;
use uuid::Uuid;

use super::common::{bad_request, list_collection, method_not_allowed, parse_body, passthrough_status};
use crate::error::StoreError;
use crate::models::{AssetLiabilityRequest, Document, FieldValue, Fields, UserSession};
use crate::state::AppState;

/// 资产负债类集合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ledger {
    Assets,
    Liabilities,
}

impl Ledger {
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Assets => "Assets",
            Self::Liabilities => "Liabilities",
        }
    }
}

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]").expect("固定正则"))
}

/// 名称转文档 ID：非字母数字替换为 `_` 并转小写，为空时使用 UUID
pub fn document_id(name: &str) -> String {
    let id = non_alphanumeric().replace_all(name, "_").to_lowercase();
    if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id
    }
}

async fn list_entries(
    state: web::Data<AppState>,
    session: UserSession,
    ledger: web::Data<Ledger>,
) -> Result<HttpResponse, StoreError> {
    list_collection(&state.store, &session, ledger.collection()).await
}

async fn save_entry(
    state: web::Data<AppState>,
    session: UserSession,
    ledger: web::Data<Ledger>,
    body: web::Bytes,
) -> Result<HttpResponse, StoreError> {
    let collection = ledger.collection();
    let Some((name, amount)) = parse_body::<AssetLiabilityRequest>(&body).and_then(AssetLiabilityRequest::validate) else {
        log::warn!("{} 记录缺少名称或金额无效", collection);
        return Ok(bad_request());
    };

    let doc_id = document_id(&name);
    let mut fields = Fields::new();
    fields.insert("name".into(), FieldValue::string(name));
    fields.insert("amount".into(), FieldValue::DoubleValue(amount));
    let document = Document::new(fields);
    log::info!("保存 {}/{}", collection, doc_id);

    let response = state.store.patch(&session, collection, &doc_id, &document).await?;
    if !response.is_success() {
        log::error!("保存 {}/{} 失败: HTTP {}", collection, doc_id, response.status);
        return Ok(passthrough_status(response.status));
    }
    Ok(HttpResponse::Ok().json(document))
}

fn ledger_resource(path: &str, ledger: Ledger) -> actix_web::Resource {
    web::resource(path)
        .app_data(web::Data::new(ledger))
        .route(web::get().to(list_entries))
        .route(web::post().to(save_entry))
        .default_service(web::to(method_not_allowed))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(ledger_resource("/assets", Ledger::Assets))
        .service(ledger_resource("/liabilities", Ledger::Liabilities));
}
