//! 税务计算结果
//!
//! 最新一次结果固定写入 `TaxHistory/latest`

use actix_web::{web, HttpResponse};

use super::common::{bad_request, list_collection, method_not_allowed, parse_body, write_result};
use crate::error::StoreError;
use crate::models::{Document, FieldValue, Fields, TaxRequest, UserSession};
use crate::state::AppState;

const TAX_HISTORY: &str = "TaxHistory";
const LATEST: &str = "latest";

async fn list_tax(state: web::Data<AppState>, session: UserSession) -> Result<HttpResponse, StoreError> {
    list_collection(&state.store, &session, TAX_HISTORY).await
}

async fn save_tax(
    state: web::Data<AppState>,
    session: UserSession,
    body: web::Bytes,
) -> Result<HttpResponse, StoreError> {
    let Some(result) = parse_body::<TaxRequest>(&body).and_then(TaxRequest::validate) else {
        log::warn!("税务结果为空");
        return Ok(bad_request());
    };

    let mut fields = Fields::new();
    fields.insert("result".into(), FieldValue::string(result));
    log::info!("保存税务结果 (用户 {})", session.local_id);

    let response = state
        .store
        .patch(&session, TAX_HISTORY, LATEST, &Document::new(fields))
        .await?;
    Ok(write_result(matches!(response.status, 200 | 201), response.status, "Saved"))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/tax")
            .route(web::get().to(list_tax))
            .route(web::post().to(save_tax))
            .default_service(web::to(method_not_allowed)),
    );
}
