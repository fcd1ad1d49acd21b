//! 注册中心凭据会话。
//!
//! 持有短期 access token 与长期 refresh token：
//! - 读取 access token 不做过期检查，过期由下游 401 暴露
//! - 续期串行化：同一时刻最多一个续期流程在执行
//! - refresh token 被拒（4xx）时回退为使用配置账号完整登录

use crate::{AuthError, endpoint};
use api_contract::{RefreshRequest, TokenPairResponse, TokenRequest};
use devhub_telemetry::{record_reauthentication, record_token_renewal};
use reqwest::Url;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// 长期账号（用于首次登录与续期失败后的重新登录）。
#[derive(Clone)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Default)]
struct TokenState {
    access: String,
    refresh: String,
}

/// 进程级共享的凭据会话。
pub struct CredentialSession {
    http: reqwest::Client,
    base_url: Url,
    credentials: RegistryCredentials,
    tokens: RwLock<TokenState>,
    // 续期/登录互斥；读 token 只与写入互斥，不与其它读者互斥
    renewal: Mutex<()>,
}

impl CredentialSession {
    /// 创建尚未登录的会话。
    pub fn new(http: reqwest::Client, base_url: Url, credentials: RegistryCredentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
            tokens: RwLock::new(TokenState::default()),
            renewal: Mutex::new(()),
        }
    }

    /// 当前缓存的 access token。
    pub async fn current_access_token(&self) -> String {
        self.tokens.read().await.access.clone()
    }

    /// 使用给定账号完整登录，成功后同时替换 access 与 refresh。
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let _guard = self.renewal.lock().await;
        self.login_locked(username, password).await
    }

    /// 使用配置的长期账号登录。
    pub async fn login(&self) -> Result<(), AuthError> {
        let _guard = self.renewal.lock().await;
        let credentials = self.credentials.clone();
        self.login_locked(&credentials.username, &credentials.password)
            .await
    }

    /// 用 refresh token 换发新 token；refresh 被拒时回退为完整登录。
    pub async fn renew(&self) -> Result<(), AuthError> {
        let _guard = self.renewal.lock().await;
        self.renew_locked().await
    }

    /// 仅当 `seen` 仍是当前 access token 时才续期。
    ///
    /// 多个请求同时拿旧 token 收到 401 时，只有第一个真正发起续期，
    /// 其余在锁释放后发现 token 已更新，直接返回。
    pub async fn renew_if_stale(&self, seen: &str) -> Result<(), AuthError> {
        let _guard = self.renewal.lock().await;
        if self.tokens.read().await.access != seen {
            return Ok(());
        }
        self.renew_locked().await
    }

    async fn renew_locked(&self) -> Result<(), AuthError> {
        let refresh = self.tokens.read().await.refresh.clone();
        let url = endpoint(&self.base_url, &["token", "refresh"])
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        let response = self
            .http
            .post(url)
            .json(&RefreshRequest { refresh })
            .send()
            .await
            .map_err(map_transport)?;
        let status = response.status();
        if status.is_success() {
            let pair = read_token_pair(response).await?;
            let mut tokens = self.tokens.write().await;
            tokens.access = pair.access;
            // 未轮换时沿用原 refresh token
            if let Some(refresh) = pair.refresh {
                tokens.refresh = refresh;
            }
            record_token_renewal();
            info!(target: "devhub.registry", "token_renewed");
            return Ok(());
        }
        if status.is_client_error() {
            warn!(
                target: "devhub.registry",
                status = status.as_u16(),
                "refresh_rejected_reauthenticating"
            );
            record_reauthentication();
            let credentials = self.credentials.clone();
            return self
                .login_locked(&credentials.username, &credentials.password)
                .await;
        }
        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn login_locked(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let url = endpoint(&self.base_url, &["token"])
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        let response = self
            .http
            .post(url)
            .json(&TokenRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(map_transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let pair = read_token_pair(response).await?;
        let refresh = pair
            .refresh
            .ok_or_else(|| AuthError::InvalidResponse("login response without refresh".to_string()))?;
        let mut tokens = self.tokens.write().await;
        tokens.access = pair.access;
        tokens.refresh = refresh;
        info!(target: "devhub.registry", username = %username, "registry_login_ok");
        Ok(())
    }
}

async fn read_token_pair(response: reqwest::Response) -> Result<TokenPairResponse, AuthError> {
    let body = response.bytes().await.map_err(map_transport)?;
    serde_json::from_slice::<TokenPairResponse>(&body)
        .map_err(|err| AuthError::InvalidResponse(err.to_string()))
}

fn map_transport(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::Transport(err.to_string())
    }
}
