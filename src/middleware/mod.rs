//! 中间件

pub mod cookie_auth;

pub use cookie_auth::CookieAuth;
