//! 认证能力：校验读接口携带的 bearer token，提取调用方身份。
//!
//! token 由注册中心签发（HS256），payload 中带 `username` claim。
//! 本服务只做校验，不签发生产 token。

mod jwt;

pub use jwt::JwtManager;

/// 认证相关错误。
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    TokenExpired,
    #[error("token invalid")]
    TokenInvalid,
    #[error("username missing in token")]
    MissingUsername,
    #[error("internal error: {0}")]
    Internal(String),
}

/// 从 token 中解析出的调用方。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

/// token 校验 trait，便于替换实现与测试。
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, TokenError>;
}

impl TokenVerifier for JwtManager {
    fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        self.decode_principal(token)
    }
}
