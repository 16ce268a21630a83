use actix_web::{web, HttpResponse};

use super::common::market_response;
use crate::models::{HistoryQuery, SymbolValidity};
use crate::services::Timeframe;
use crate::state::AppState;

pub async fn get_stock(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let symbol = path.into_inner();
    market_response(state.stocks.get_quote(&symbol).await)
}

pub async fn get_stock_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> HttpResponse {
    let symbol = path.into_inner();
    let timeframe = Timeframe::parse(query.timeframe.as_deref().unwrap_or("1M"));
    market_response(state.stocks.get_history(&symbol, timeframe).await)
}

pub async fn get_stock_daily(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let symbol = path.into_inner();
    market_response(state.stocks.get_daily_series(&symbol).await)
}

pub async fn validate_symbol(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let symbol = path.into_inner().trim().to_uppercase();
    let valid = state.stocks.is_valid_symbol(&symbol).await;
    market_response(Ok(SymbolValidity { symbol, valid }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stocks")
            .route("/{symbol}", web::get().to(get_stock))
            .route("/{symbol}/history", web::get().to(get_stock_history))
            .route("/{symbol}/daily", web::get().to(get_stock_daily))
            .route("/{symbol}/valid", web::get().to(validate_symbol)),
    );
}
