use crate::{Principal, TokenError};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize)]
/// JWT claims（注册中心签发的字段子集）。
struct Claims {
    #[serde(default)]
    username: Option<String>,
    exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
}

/// JWT 校验（以及测试用签发）。
pub struct JwtManager {
    secret: Vec<u8>,
    issuer: Option<String>,
}

impl JwtManager {
    /// 创建 JWT 管理器；issuer 为 None 时不校验 iss。
    pub fn new(secret: String, issuer: Option<String>) -> Self {
        Self {
            secret: secret.into_bytes(),
            issuer,
        }
    }

    /// 解析 access token，返回调用方身份。
    pub fn decode_principal(&self, token: &str) -> Result<Principal, TokenError> {
        let claims = self.decode_claims(token)?;
        match claims.username {
            Some(username) if !username.is_empty() => Ok(Principal { username }),
            _ => Err(TokenError::MissingUsername),
        }
    }

    /// 签发 access token（与注册中心相同的 claim 结构）。
    pub fn issue_token(&self, username: &str, ttl_seconds: u64) -> Result<String, TokenError> {
        let claims = Claims {
            username: Some(username.to_string()),
            exp: (now_epoch_seconds() + ttl_seconds) as usize,
            iss: self.issuer.clone(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|err| TokenError::Internal(err.to_string()))
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }
        let decoded = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(map_jwt_error)?;
        Ok(decoded.claims)
    }
}

/// 当前时间戳（秒）。
fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// 将 jwt 库错误映射为业务错误。
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        _ => TokenError::TokenInvalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_username_is_rejected() {
        let manager = JwtManager::new("secret".to_string(), None);
        let claims = Claims {
            username: None,
            exp: (now_epoch_seconds() + 60) as usize,
            iss: None,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .expect("encode");
        assert!(matches!(
            manager.decode_principal(&token),
            Err(TokenError::MissingUsername)
        ));
    }
}
