use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::IssuedConfirmationCode;
use crate::error::Result;
use crate::value_objects::{ConfirmationCode, EmailAddress};

/// 验证码投递接口
///
/// 由应用层实现（SMTP、短信网关等）。投递失败时返回 [`crate::Error::Transport`]，
/// 验证码记录此时已经持久化，调用方可以在冷却期结束后重新请求。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_confirmation_code(&self, code: &IssuedConfirmationCode) -> Result<()>;
}

/// 记录所有投递内容的内存实现
///
/// 不真正发送任何消息，适用于本地开发和测试。
#[derive(Debug, Clone, Default)]
pub struct OutboxTransport {
    sent: Arc<RwLock<Vec<IssuedConfirmationCode>>>,
}

impl OutboxTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已投递的全部记录（按投递顺序）
    pub fn sent(&self) -> Vec<IssuedConfirmationCode> {
        self.sent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 最近一次投递到某个邮箱的验证码
    pub fn last_sent_to(&self, email_address: &EmailAddress) -> Option<ConfirmationCode> {
        self.sent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|issued| &issued.email_address == email_address)
            .map(|issued| issued.code.clone())
    }
}

#[async_trait]
impl Transport for OutboxTransport {
    async fn send_confirmation_code(&self, code: &IssuedConfirmationCode) -> Result<()> {
        self.sent
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(code.clone());
        Ok(())
    }
}
