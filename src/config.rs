//! 配置模块
//!
//! [`CommunityConfig`] 汇总所有可调参数和 Access Token 签名密钥。
//!
//! ## 环境变量
//!
//! | 变量 | 说明 | 默认值 |
//! |---|---|---|
//! | `COMMUNITY_ACCESS_TOKEN_SIGNING_KEY` | 1024 字节签名密钥的标准 base64 编码 | 必填 |
//! | `COMMUNITY_ACCESS_TOKEN_TTL_SECS` | Access Token 有效期（秒） | 20 天 |
//! | `COMMUNITY_CONFIRMATION_CODE_TTL_SECS` | 验证码有效期（秒） | 1800 |
//! | `COMMUNITY_REQUEST_LOGIN_COOL_DOWN_SECS` | 登录请求冷却时间（秒） | 120 |

use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::member::{DEFAULT_CONFIRMATION_CODE_TTL, DEFAULT_REQUEST_LOGIN_COOL_DOWN};
use crate::value_objects::AccessTokenSigningKey;

/// Access Token 默认有效期：20 天
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(20 * 24 * 60 * 60);

pub const ENV_SIGNING_KEY: &str = "COMMUNITY_ACCESS_TOKEN_SIGNING_KEY";
pub const ENV_ACCESS_TOKEN_TTL: &str = "COMMUNITY_ACCESS_TOKEN_TTL_SECS";
pub const ENV_CONFIRMATION_CODE_TTL: &str = "COMMUNITY_CONFIRMATION_CODE_TTL_SECS";
pub const ENV_REQUEST_LOGIN_COOL_DOWN: &str = "COMMUNITY_REQUEST_LOGIN_COOL_DOWN_SECS";

/// 在 Unix 时间戳上加一段时长，溢出时饱和到 `i64::MAX`
pub(crate) fn timestamp_after(timestamp: i64, duration: Duration) -> i64 {
    i64::try_from(duration.as_secs())
        .map_or(i64::MAX, |secs| timestamp.saturating_add(secs))
}

/// 社区配置
#[derive(Debug, Clone)]
pub struct CommunityConfig {
    /// Access Token 签名密钥
    pub signing_key: Option<AccessTokenSigningKey>,
    /// Access Token 有效期
    pub access_token_ttl: Duration,
    /// 验证码有效期
    pub confirmation_code_ttl: Duration,
    /// 两次登录请求之间的最小间隔
    pub request_login_cool_down: Duration,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            signing_key: None,
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            confirmation_code_ttl: DEFAULT_CONFIRMATION_CODE_TTL,
            request_login_cool_down: DEFAULT_REQUEST_LOGIN_COOL_DOWN,
        }
    }
}

impl CommunityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signing_key(mut self, key: AccessTokenSigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn with_confirmation_code_ttl(mut self, ttl: Duration) -> Self {
        self.confirmation_code_ttl = ttl;
        self
    }

    pub fn with_request_login_cool_down(mut self, cool_down: Duration) -> Self {
        self.request_login_cool_down = cool_down;
        self
    }

    /// 从进程环境变量读取配置
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源读取配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoded = lookup(ENV_SIGNING_KEY)
            .ok_or_else(|| ConfigError::MissingRequired(ENV_SIGNING_KEY.into()))?;
        let signing_key =
            AccessTokenSigningKey::from_base64(&encoded).map_err(|e| ConfigError::InvalidValue {
                key: ENV_SIGNING_KEY.into(),
                message: e.to_string(),
            })?;

        let mut config = Self::new().with_signing_key(signing_key);

        if let Some(ttl) = seconds(&lookup, ENV_ACCESS_TOKEN_TTL)? {
            config.access_token_ttl = ttl;
        }
        if let Some(ttl) = seconds(&lookup, ENV_CONFIRMATION_CODE_TTL)? {
            config.confirmation_code_ttl = ttl;
        }
        if let Some(cool_down) = seconds(&lookup, ENV_REQUEST_LOGIN_COOL_DOWN)? {
            config.request_login_cool_down = cool_down;
        }

        Ok(config)
    }

    /// 取出签名密钥，未配置时报错
    pub fn require_signing_key(&self) -> Result<&AccessTokenSigningKey> {
        self.signing_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired("access_token_signing_key".into()).into())
    }
}

fn seconds<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.into(),
        message,
    };

    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| invalid(e.to_string()))?;
    if i64::try_from(secs).is_err() {
        return Err(invalid(format!("{} seconds is out of range", secs)).into());
    }

    Ok(Some(Duration::from_secs(secs)))
}
