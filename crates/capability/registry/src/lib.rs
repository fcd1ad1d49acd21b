//! 注册中心能力：凭据会话、设备查询/注册客户端与设备目录缓存。
//!
//! 调用链：`DeviceDirectory` → `DeviceRegistry`（`RegistryClient`）→ `CredentialSession`。
//! 所有出站 HTTP 调用共用同一个带超时的 reqwest 客户端。

mod client;
mod directory;
mod session;

use async_trait::async_trait;
use domain::{Device, DeviceFamily};

pub use client::{RegistryClient, RegistryConfig};
pub use directory::DeviceDirectory;
pub use session::{CredentialSession, RegistryCredentials};

/// 登录/续期错误。
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("registry rejected credentials ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("registry auth call timed out")]
    Timeout,
    #[error("registry auth transport error: {0}")]
    Transport(String),
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

/// 注册中心调用错误。
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("registry call timed out")]
    Timeout,
    #[error("registry transport error: {0}")]
    Transport(String),
    #[error("invalid registry response: {0}")]
    InvalidResponse(String),
    #[error("invalid registry url: {0}")]
    InvalidUrl(String),
}

/// 设备注册请求。
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRegistration {
    pub serial: String,
    pub description: String,
    pub family: DeviceFamily,
    pub owner: i64,
}

/// 注册结果：注册中心已有同序列号设备时视为成功。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    AlreadyExists,
}

/// 设备注册中心抽象。
///
/// 本接口不保证注册幂等，调用方负责避免重复注册。
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// 全量设备（需要特权账号）。
    async fn list_all_devices(&self) -> Result<Vec<Device>, RegistryError>;

    /// 指定用户有权查看的设备。
    async fn list_devices_for_user(&self, user: &str) -> Result<Vec<Device>, RegistryError>;

    async fn register_device(
        &self,
        registration: &DeviceRegistration,
    ) -> Result<RegisterOutcome, RegistryError>;
}

pub(crate) fn endpoint(base: &reqwest::Url, segments: &[&str]) -> Result<reqwest::Url, RegistryError> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| RegistryError::InvalidUrl(base.to_string()))?;
        path.pop_if_empty();
        path.extend(segments);
        // 注册中心路由要求结尾斜杠
        path.push("");
    }
    Ok(url)
}
