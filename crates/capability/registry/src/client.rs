//! 注册中心 HTTP 客户端。
//!
//! 每个调用携带当前 access token；收到 401 时续期一次并重放一次，
//! 第二次 401 或其它非预期状态码直接返回 `RegistryError::Status`。

use crate::{
    CredentialSession, DeviceRegistration, DeviceRegistry, RegisterOutcome, RegistryCredentials,
    RegistryError, endpoint,
};
use api_contract::{RegisterDeviceRequest, RegistryDeviceDto};
use async_trait::async_trait;
use domain::{Device, DeviceFamily};
use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 注册中心连接配置。
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

/// 注册中心客户端。
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<CredentialSession>,
}

impl RegistryClient {
    /// 构造客户端并完成首次登录；登录失败由调用方决定是否终止进程。
    pub async fn connect(config: RegistryConfig) -> Result<Self, RegistryError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| RegistryError::InvalidUrl(format!("{}: {}", config.base_url, err)))?;
        if base_url.cannot_be_a_base() {
            return Err(RegistryError::InvalidUrl(config.base_url));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| RegistryError::Transport(err.to_string()))?;
        let session = Arc::new(CredentialSession::new(
            http.clone(),
            base_url.clone(),
            RegistryCredentials {
                username: config.username,
                password: config.password,
            },
        ));
        session.login().await?;
        Ok(Self::new(http, base_url, session))
    }

    pub fn new(http: reqwest::Client, base_url: Url, session: Arc<CredentialSession>) -> Self {
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &Arc<CredentialSession> {
        &self.session
    }

    async fn send_authorized<F>(&self, build: F) -> Result<reqwest::Response, RegistryError>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        let token = self.session.current_access_token().await;
        let response = build(&self.http, &token)
            .send()
            .await
            .map_err(map_transport)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        debug!(target: "devhub.registry", "access_token_rejected_renewing");
        self.session.renew_if_stale(&token).await?;
        let token = self.session.current_access_token().await;
        build(&self.http, &token)
            .send()
            .await
            .map_err(map_transport)
    }

    async fn fetch_devices(&self, url: Url) -> Result<Vec<Device>, RegistryError> {
        let response = self
            .send_authorized(|http, token| http.get(url.clone()).bearer_auth(token))
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        let body = response.bytes().await.map_err(map_transport)?;
        let devices: Vec<RegistryDeviceDto> = serde_json::from_slice(&body)
            .map_err(|err| RegistryError::InvalidResponse(err.to_string()))?;
        Ok(devices.into_iter().map(device_from_dto).collect())
    }
}

#[async_trait]
impl DeviceRegistry for RegistryClient {
    async fn list_all_devices(&self) -> Result<Vec<Device>, RegistryError> {
        let url = endpoint(&self.base_url, &["devices"])?;
        self.fetch_devices(url).await
    }

    async fn list_devices_for_user(&self, user: &str) -> Result<Vec<Device>, RegistryError> {
        let url = endpoint(&self.base_url, &["devices", user])?;
        self.fetch_devices(url).await
    }

    async fn register_device(
        &self,
        registration: &DeviceRegistration,
    ) -> Result<RegisterOutcome, RegistryError> {
        let url = endpoint(&self.base_url, &["devices"])?;
        let body = RegisterDeviceRequest {
            serial_number: registration.serial.clone(),
            description: registration.description.clone(),
            device_type: registration.family.as_str().to_string(),
            client: registration.owner,
        };
        let response = self
            .send_authorized(|http, token| http.post(url.clone()).bearer_auth(token).json(&body))
            .await?;
        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(RegisterOutcome::Created);
        }
        let text = response.text().await.unwrap_or_default();
        if is_duplicate_serial(status, &text) {
            return Ok(RegisterOutcome::AlreadyExists);
        }
        Err(RegistryError::Status {
            status: status.as_u16(),
            body: text,
        })
    }
}

async fn expect_status(
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<reqwest::Response, RegistryError> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RegistryError::Status {
        status: status.as_u16(),
        body,
    })
}

// 序列号唯一约束冲突：400/409 且报错内容为 "already exists"
fn is_duplicate_serial(status: StatusCode, body: &str) -> bool {
    matches!(status, StatusCode::BAD_REQUEST | StatusCode::CONFLICT)
        && body.to_ascii_lowercase().contains("already exists")
}

fn device_from_dto(dto: RegistryDeviceDto) -> Device {
    Device {
        serial: dto.serial_number,
        topics: dto.topics,
        family: dto.device_type.as_deref().and_then(DeviceFamily::parse),
        owner: dto.client,
        description: dto.description,
    }
}

fn map_transport(err: reqwest::Error) -> RegistryError {
    if err.is_timeout() {
        RegistryError::Timeout
    } else {
        RegistryError::Transport(err.to_string())
    }
}
