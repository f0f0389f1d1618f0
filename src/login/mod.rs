//! 登录凭证模块
//!
//! 无密码登录的两个一次性凭证：
//!
//! - **验证码**：通过邮件等带外渠道发送的 6 位数字，30 分钟内有效，只能使用一次
//! - **成员公钥**：客户端登录时提交并绑定到账户的 Ed25519 公钥，全系统范围内只能使用一次
//!
//! 本模块只定义凭证记录和存储/投递接口，实际的邮件或短信发送由应用层实现
//! [`Transport`] 完成。
//!
//! ## 原子性约定
//!
//! [`ConfirmationCodeStore::mark_used`] 与 [`PublicKeyStore::mark_used`] 必须是
//! compare-and-set：并发的两次调用中最多只有一次返回 `true`。登录流程依赖这一点
//! 防止同一个验证码或公钥被重放。

mod store;
mod transport;

pub use store::{
    ConfirmationCodeStore, InMemoryConfirmationCodeStore, InMemoryPublicKeyStore, PublicKeyStore,
};
pub use transport::{OutboxTransport, Transport};

#[cfg(test)]
pub use transport::MockTransport;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::timestamp_after;
use crate::member::MemberId;
use crate::value_objects::{ConfirmationCode, EmailAddress};

/// 已签发的验证码记录
///
/// 记录永不删除：使用过的验证码保留下来作为审计和防重放依据。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedConfirmationCode {
    pub id: Uuid,
    /// 验证码所属成员
    pub member_id: MemberId,
    pub email_address: EmailAddress,
    pub code: ConfirmationCode,
    /// 签发时间（Unix 时间戳，秒）
    pub issued_at: i64,
    pub used: bool,
}

impl IssuedConfirmationCode {
    pub fn new(
        member_id: MemberId,
        email_address: EmailAddress,
        code: ConfirmationCode,
        issued_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            email_address,
            code,
            issued_at,
            used: false,
        }
    }

    /// `issued_at + ttl <= now` 即视为过期
    pub fn is_expired_at(&self, now: i64, ttl: Duration) -> bool {
        timestamp_after(self.issued_at, ttl) <= now
    }
}
