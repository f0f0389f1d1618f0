//! 成员模块
//!
//! 包含成员实体、成员存储接口以及负责注册、登录的 [`MemberService`]。
//!
//! ## 账户生命周期
//!
//! 无账户 → 未验证账户（注册）→ 邮箱已验证（首次登录）→ 社区已认证（申请通过）→ 管理员（提升）。
//! 当前阶段可以通过 [`Member::status`] 得到。

mod service;
mod store;

pub use service::{DEFAULT_CONFIRMATION_CODE_TTL, DEFAULT_REQUEST_LOGIN_COOL_DOWN, MemberService};
pub use store::{InMemoryMemberStore, MemberStore};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::value_objects::{Base64String, EmailAddress, MemberAccessPublicKey, ProperName, Username};

/// 成员标识符
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub Uuid);

impl MemberId {
    /// 生成新的随机标识符
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 是否为全零标识符
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MemberId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ValidationError::InvalidIdentifier(s.to_string()))
    }
}

/// 成员资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub proper_name: ProperName,
    pub profile_image: Option<Base64String>,
}

impl Metadata {
    pub fn new(proper_name: ProperName) -> Self {
        Self {
            proper_name,
            profile_image: None,
        }
    }

    pub fn with_profile_image(mut self, image: Base64String) -> Self {
        self.profile_image = Some(image);
        self
    }
}

/// 账户所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountStatus {
    /// 已注册，尚未通过验证码登录
    Unverified,
    /// 邮箱已验证
    EmailVerified,
    /// 社区认证已通过
    CommunityVerified,
    /// 管理员
    Admin,
}

/// 成员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub created_at: DateTime<Utc>,
    pub username: Username,
    pub email_address: EmailAddress,
    pub metadata: Metadata,
    /// 是否已通过验证码证明邮箱归属
    pub verified_email_address: bool,
    /// 是否已通过社区认证
    pub verified: bool,
    pub admin: bool,
    /// 最近一次登录绑定的公钥
    pub public_key: Option<MemberAccessPublicKey>,
    /// 最近一次登录签发的 Access Token ID
    pub access_token_id: Option<Uuid>,
}

impl Member {
    /// 创建一个新成员，所有标志位均为 false
    pub fn new(username: Username, email_address: EmailAddress, metadata: Metadata) -> Self {
        Self {
            id: MemberId::new(),
            created_at: Utc::now(),
            username,
            email_address,
            metadata,
            verified_email_address: false,
            verified: false,
            admin: false,
            public_key: None,
            access_token_id: None,
        }
    }

    pub fn status(&self) -> AccountStatus {
        if self.admin {
            AccountStatus::Admin
        } else if self.verified {
            AccountStatus::CommunityVerified
        } else if self.verified_email_address {
            AccountStatus::EmailVerified
        } else {
            AccountStatus::Unverified
        }
    }
}
