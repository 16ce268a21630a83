//! 加密货币钱包
//!
//! - GET  /api/wallet                     已保存的钱包
//! - GET  /api/wallet?type=BTC[&address=] 实时币价或地址快照（不保存）
//! - POST /api/wallet                     添加钱包并保存快照
//! - POST /api/wallet/{address}/refresh   刷新已保存的钱包

use actix_web::{http::StatusCode, web, HttpResponse};
use serde_json::{json, Value};

use super::common::{market_response, method_not_allowed, parse_body, passthrough_status};
use crate::error::StoreError;
use crate::models::{ApiResponse, ListDocuments, UserSession, Wallet, WalletQuery, WalletRequest};
use crate::services::CryptoType;
use crate::state::AppState;

const WALLETS: &str = "Wallets";

fn envelope_error(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse::<()>::error(message.into()))
}

fn unsupported(crypto_type: &str) -> HttpResponse {
    log::warn!("不支持的币种: {}", crypto_type);
    envelope_error(
        StatusCode::BAD_REQUEST,
        format!("不支持的币种: {}", crypto_type),
    )
}

/// 读取用户的全部钱包；上游非 200 时返回其状态码
async fn load_wallets(
    state: &AppState,
    session: &UserSession,
) -> Result<Result<Vec<Wallet>, u16>, StoreError> {
    let response = state.store.list(session, WALLETS).await?;
    if response.status != 200 {
        log::warn!("读取钱包返回 HTTP {}", response.status);
        return Ok(Err(response.status));
    }
    let list: ListDocuments = serde_json::from_slice(&response.body)?;
    Ok(Ok(list.documents.iter().filter_map(Wallet::from_document).collect()))
}

/// 拉取快照、覆盖钱包并保存
async fn refresh_and_save(
    state: &AppState,
    session: &UserSession,
    mut wallet: Wallet,
    crypto: CryptoType,
) -> Result<HttpResponse, StoreError> {
    let info = match state.wallets.get_wallet_info(wallet.address(), crypto).await {
        Ok(info) => info,
        Err(e) => return Ok(market_response::<Value>(Err(e))),
    };
    wallet.update_info(info);

    let response = state
        .store
        .patch(session, WALLETS, wallet.id(), &wallet.to_document())
        .await?;
    if !response.is_success() {
        log::error!("保存钱包 {} 失败: HTTP {}", wallet.id(), response.status);
        return Ok(passthrough_status(response.status));
    }
    log::info!("已保存钱包 {} (用户 {})", wallet.id(), session.local_id);
    Ok(market_response(Ok(wallet.to_json())))
}

async fn get_wallets(
    state: web::Data<AppState>,
    session: UserSession,
    query: web::Query<WalletQuery>,
) -> Result<HttpResponse, StoreError> {
    let query = query.into_inner();
    let address = query.address.as_deref().map(str::trim).filter(|a| !a.is_empty());

    let Some(crypto_type) = query.crypto_type.as_deref() else {
        if address.is_some() {
            return Ok(envelope_error(
                StatusCode::BAD_REQUEST,
                "缺少 type 参数",
            ));
        }
        return Ok(match load_wallets(&state, &session).await? {
            Ok(wallets) => market_response(Ok(wallets.iter().map(Wallet::to_json).collect::<Vec<_>>())),
            Err(status) => passthrough_status(status),
        });
    };
    let Some(crypto) = CryptoType::parse(crypto_type) else {
        return Ok(unsupported(crypto_type));
    };

    Ok(match address {
        None => market_response(state.wallets.get_price_info(crypto).await.map(|price| {
            json!({
                "currentPrice": price.current_price,
                "priceChange24h": price.price_change_percentage_24h,
            })
        })),
        Some(address) => market_response(state.wallets.get_wallet_info(address, crypto).await.map(|info| {
            json!({
                "balance": info.balance,
                "value": info.balance * info.current_price,
                "change24h": info.price_change_24h,
                "currentPrice": info.current_price,
                "transactions": info.transactions,
            })
        })),
    })
}

async fn add_wallet(
    state: web::Data<AppState>,
    session: UserSession,
    body: web::Bytes,
) -> Result<HttpResponse, StoreError> {
    let Some(request) = parse_body::<WalletRequest>(&body).filter(WalletRequest::is_complete) else {
        log::warn!("钱包字段缺失");
        return Ok(envelope_error(
            StatusCode::BAD_REQUEST,
            "label、address、cryptoType 不能为空",
        ));
    };
    let Some(crypto) = CryptoType::parse(&request.crypto_type) else {
        return Ok(unsupported(&request.crypto_type));
    };

    let wallet = Wallet::new(request.label.trim(), request.address.trim(), crypto.symbol());
    log::info!("添加 {} 钱包 {}", crypto.symbol(), wallet.address());
    refresh_and_save(&state, &session, wallet, crypto).await
}

async fn refresh_wallet(
    state: web::Data<AppState>,
    session: UserSession,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let address = path.into_inner();
    let wallets = match load_wallets(&state, &session).await? {
        Ok(wallets) => wallets,
        Err(status) => return Ok(passthrough_status(status)),
    };
    let Some(wallet) = wallets.into_iter().find(|w| w.address() == address) else {
        log::warn!("未找到钱包 {}", address);
        return Ok(envelope_error(
            StatusCode::NOT_FOUND,
            format!("未找到钱包 {}", address),
        ));
    };
    let Some(crypto) = CryptoType::parse(wallet.crypto_type()) else {
        return Ok(unsupported(wallet.crypto_type()));
    };
    refresh_and_save(&state, &session, wallet, crypto).await
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/wallet")
            .route(web::get().to(get_wallets))
            .route(web::post().to(add_wallet))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/wallet/{address}/refresh")
            .route(web::post().to(refresh_wallet))
            .default_service(web::to(method_not_allowed)),
    );
}

#[cfg(test)]
mod tests {
    use crate::handlers::common::testing::{authed, user_path};
    use actix_web::test;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADDR: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    async fn mount_btc(server: &MockServer, satoshis: i64) {
        Mock::given(method("GET"))
            .and(path("/v1/cryptocurrency/quotes/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"BTC": {"quote": {"USD": {"price": 60000.0, "percent_change_24h": 2.0}}}}
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/rawaddr/{}", ADDR)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "final_balance": satoshis,
                "txs": [{
                    "hash": "h1", "time": 1_710_460_800,
                    "inputs": [{"prev_out": {"addr": "1Sender"}}],
                    "out": [{"addr": ADDR, "value": 1000}]
                }]
            })))
            .mount(server)
            .await;
    }

    fn stored_wallet(id: &str, balance: f64) -> Value {
        json!({
            "name": format!("projects/cashclimb-test/databases/(default)/documents/Users/u1/Wallets/{}", id),
            "fields": {
                "id": {"stringValue": id},
                "label": {"stringValue": "Cold"},
                "address": {"stringValue": ADDR},
                "cryptoType": {"stringValue": "BTC"},
                "balance": {"doubleValue": balance},
                "value": {"doubleValue": 0.0},
                "change24h": {"doubleValue": 0.0},
                "lastUpdated": {"stringValue": "2024-01-01T00:00:00+00:00"}
            }
        })
    }

    #[actix_web::test]
    async fn test_price_only_without_address() {
        let server = MockServer::start().await;
        mount_btc(&server, 0).await;

        let app = test_app!(&server.uri());
        let req = authed(test::TestRequest::get().uri("/api/wallet?type=BTC")).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], json!({"currentPrice": 60000.0, "priceChange24h": 2.0}));
    }

    #[actix_web::test]
    async fn test_address_snapshot_is_not_saved() {
        let server = MockServer::start().await;
        mount_btc(&server, 200_000_000).await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = test_app!(&server.uri());
        let uri = format!("/api/wallet?type=btc&address={}", ADDR);
        let req = authed(test::TestRequest::get().uri(&uri)).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["balance"], 2.0);
        assert_eq!(body["data"]["value"], 120000.0);
        assert_eq!(body["data"]["transactions"][0]["type"], "RECEIVE");
    }

    #[actix_web::test]
    async fn test_bad_query_is_400() {
        let server = MockServer::start().await;
        let app = test_app!(&server.uri());

        for uri in ["/api/wallet?type=DOGE", "/api/wallet?address=1A1z"] {
            let req = authed(test::TestRequest::get().uri(uri)).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 400, "{}", uri);
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_list_saved_wallets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(user_path("Wallets")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [stored_wallet("w1", 1.5), {"name": "broken", "fields": {}}]
            })))
            .mount(&server)
            .await;

        let app = test_app!(&server.uri());
        let req = authed(test::TestRequest::get().uri("/api/wallet")).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let wallets = body["data"].as_array().unwrap();
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0]["id"], "w1");
        assert_eq!(wallets[0]["balance"], 1.5);
    }

    #[actix_web::test]
    async fn test_list_passes_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(user_path("Wallets")))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let app = test_app!(&server.uri());
        let req = authed(test::TestRequest::get().uri("/api/wallet")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
        assert!(test::read_body(resp).await.is_empty());
    }

    #[actix_web::test]
    async fn test_add_wallet_saves_snapshot() {
        let server = MockServer::start().await;
        mount_btc(&server, 100_000_000).await;
        Mock::given(method("PATCH"))
            .and(path_regex(r"^/v1/projects/cashclimb-test/databases/\(default\)/documents/Users/u1/Wallets/[0-9a-f-]{36}$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let app = test_app!(&server.uri());
        let req = authed(test::TestRequest::post().uri("/api/wallet"))
            .set_json(json!({"label": "Cold", "address": ADDR, "cryptoType": "btc"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["cryptoType"], "BTC");
        assert_eq!(body["data"]["value"], 60000.0);
        assert_eq!(body["data"]["lastTransaction"]["txHash"], "h1");

        let requests = server.received_requests().await.unwrap();
        let saved = requests.iter().find(|r| r.method.to_string() == "PATCH").unwrap();
        let doc: Value = serde_json::from_slice(&saved.body).unwrap();
        assert_eq!(doc["fields"]["balance"]["doubleValue"], 1.0);
        assert_eq!(doc["fields"]["id"]["stringValue"], body["data"]["id"]);
    }

    #[actix_web::test]
    async fn test_add_wallet_chain_failure_skips_save() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/rawaddr/{}", ADDR)))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = test_app!(&server.uri());
        let req = authed(test::TestRequest::post().uri("/api/wallet"))
            .set_json(json!({"label": "Cold", "address": ADDR, "cryptoType": "BTC"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 502);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_refresh_updates_stored_wallet() {
        let server = MockServer::start().await;
        mount_btc(&server, 300_000_000).await;
        Mock::given(method("GET"))
            .and(path(user_path("Wallets")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [stored_wallet("w1", 1.0)]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(user_path("Wallets/w1")))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let app = test_app!(&server.uri());
        let uri = format!("/api/wallet/{}/refresh", ADDR);
        let req = authed(test::TestRequest::post().uri(&uri)).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["id"], "w1");
        assert_eq!(body["data"]["balance"], 3.0);
        assert_eq!(body["data"]["value"], 180000.0);
    }

    #[actix_web::test]
    async fn test_refresh_unknown_address_is_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(user_path("Wallets")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = test_app!(&server.uri());
        let req = authed(test::TestRequest::post().uri("/api/wallet/1Nope/refresh")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
