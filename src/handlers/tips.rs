//! 收藏的理财建议，文档 ID 即建议 ID

use actix_web::{web, HttpResponse};

use super::common::{bad_request, list_collection, method_not_allowed, parse_body, write_result};
use crate::error::StoreError;
use crate::models::{Document, FieldValue, Fields, TipRequest, UserSession};
use crate::state::AppState;

const SAVED_TIPS: &str = "SavedTips";

async fn list_tips(state: web::Data<AppState>, session: UserSession) -> Result<HttpResponse, StoreError> {
    list_collection(&state.store, &session, SAVED_TIPS).await
}

async fn save_tip(
    state: web::Data<AppState>,
    session: UserSession,
    body: web::Bytes,
) -> Result<HttpResponse, StoreError> {
    let Some(tip) = parse_body::<TipRequest>(&body).filter(TipRequest::is_complete) else {
        log::warn!("建议字段缺失");
        return Ok(bad_request());
    };

    let mut fields = Fields::new();
    fields.insert("id".into(), FieldValue::string(&tip.id));
    fields.insert("category".into(), FieldValue::string(tip.category));
    fields.insert("text".into(), FieldValue::string(tip.text));
    log::info!("收藏建议 {}", tip.id);

    let response = state
        .store
        .patch(&session, SAVED_TIPS, &tip.id, &Document::new(fields))
        .await?;
    Ok(write_result(matches!(response.status, 200 | 201), response.status, "Tip saved."))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/tips")
            .route(web::get().to(list_tips))
            .route(web::post().to(save_tip))
            .default_service(web::to(method_not_allowed)),
    );
}
