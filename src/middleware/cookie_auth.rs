//! Cookie 认证中间件
//!
//! 从 `idToken` 与 `localId` 两个 Cookie 构造 `UserSession` 放入请求扩展，
//! 任一缺失或为空时直接返回 401（无响应体）。
//! 被包裹的 scope 内没有例外路径，健康检查注册在 scope 之外

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
};
use futures::future::{ok, ready, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::models::UserSession;

pub const ID_TOKEN_COOKIE: &str = "idToken";
pub const LOCAL_ID_COOKIE: &str = "localId";

fn session_from_cookies(req: &ServiceRequest) -> Option<UserSession> {
    let id_token = req.cookie(ID_TOKEN_COOKIE)?;
    let local_id = req.cookie(LOCAL_ID_COOKIE)?;
    if id_token.value().is_empty() || local_id.value().is_empty() {
        return None;
    }
    Some(UserSession::new(id_token.value(), local_id.value()))
}

/// Cookie 认证中间件
pub struct CookieAuth;

impl<S, B> Transform<S, ServiceRequest> for CookieAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CookieAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CookieAuthService {
            service: Rc::new(service),
        })
    }
}

pub struct CookieAuthService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for CookieAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            match session_from_cookies(&req) {
                Some(session) => {
                    req.extensions_mut().insert(session);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                None => {
                    log::warn!("{} {} 缺少认证 Cookie", req.method(), req.path());
                    let response = HttpResponse::Unauthorized().finish();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

/// 处理器直接以参数形式取得调用方身份
impl FromRequest for UserSession {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserSession>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::{test, web, App, HttpResponse};

    async fn whoami(session: UserSession) -> HttpResponse {
        HttpResponse::Ok().body(format!("{}:{}", session.local_id, session.id_token))
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new().service(
                    web::scope("/api")
                        .wrap(CookieAuth)
                        .route("/health", web::get().to(|| async { HttpResponse::Ok().finish() }))
                        .route("/me", web::get().to(whoami)),
                ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_missing_cookies_is_401_without_body() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        assert!(test::read_body(resp).await.is_empty());

        let req = test::TestRequest::get()
            .uri("/api/me")
            .cookie(Cookie::new(ID_TOKEN_COOKIE, "tok"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    #[actix_web::test]
    async fn test_empty_cookie_counts_as_missing() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/me")
            .cookie(Cookie::new(ID_TOKEN_COOKIE, ""))
            .cookie(Cookie::new(LOCAL_ID_COOKIE, "u1"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    #[actix_web::test]
    async fn test_session_reaches_handler() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/me")
            .cookie(Cookie::new(ID_TOKEN_COOKIE, "tok"))
            .cookie(Cookie::new(LOCAL_ID_COOKIE, "u1"))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(&body[..], b"u1:tok");
    }

    #[actix_web::test]
    async fn test_no_path_is_exempt() {
        let app = app!();
        for uri in ["/api/health", "/api/stocks/health", "/api/me"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 401, "uri {}", uri);
            assert!(test::read_body(resp).await.is_empty());
        }
    }
}
