use actix_web::{web, HttpResponse};

use super::common::market_response;
use crate::state::AppState;

pub async fn get_coin_price(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let symbol = path.into_inner();
    market_response(state.crypto.get_price(&symbol).await)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/crypto/{symbol}", web::get().to(get_coin_price));
}

#[cfg(test)]
mod tests {
    use crate::handlers::common::testing::authed;
    use actix_web::test;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[actix_web::test]
    async fn test_coin_price_in_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/cryptocurrency/quotes/latest"))
            .and(query_param("symbol", "BTC"))
            .and(header("X-CMC_PRO_API_KEY", "cmc-test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"BTC": {"quote": {"USD": {"price": 64000.5, "percent_change_24h": -2.25}}}}
            })))
            .mount(&server)
            .await;

        let app = test_app!(&server.uri());
        let req = authed(test::TestRequest::get().uri("/api/crypto/btc")).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["currentPrice"], 64000.5);
        assert_eq!(body["data"]["priceChangePercentage24h"], -2.25);
    }

    #[actix_web::test]
    async fn test_vendor_failure_is_502() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let app = test_app!(&server.uri());
        let req = authed(test::TestRequest::get().uri("/api/crypto/ETH")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 502);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_coin_price_without_cookies_is_401() {
        let server = MockServer::start().await;
        let app = test_app!(&server.uri());
        let req = test::TestRequest::get().uri("/api/crypto/BTC").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        assert!(test::read_body(resp).await.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
