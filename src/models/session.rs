//! 调用方身份
//!
//! 来自 `idToken` 与 `localId` 两个 Cookie，持有即视为身份凭证

/// 已通过 Cookie 检查的调用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    /// 作为 Bearer Token 转发给文档库
    pub id_token: String,
    /// 用户文档路径 `Users/{localId}`
    pub local_id: String,
}

impl UserSession {
    pub fn new(id_token: impl Into<String>, local_id: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
            local_id: local_id.into(),
        }
    }
}
