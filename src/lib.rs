//! # community-auth
//!
//! 会员社区的无密码认证与社区认证审核库。
//!
//! ## 功能特性
//!
//! - **无密码登录**: 邮件验证码 + 一次性 Ed25519 公钥，防重放
//! - **Access Token**: HS512 签名的 JWT，默认 20 天有效
//! - **认证申请**: 提交、审核（通过/拒绝）、重新提交的状态机
//! - **管理员权限**: 审核与查询需要管理员，支持管理员提升
//! - **观察者**: 登录成功、申请通过后同步通知
//! - **可替换存储**: 所有持久化和投递都通过 trait 注入，附带内存实现
//!
//! ## 登录流程
//!
//! ```text
//! sign_up ──▶ request_login ──(验证码经 Transport 投递)──▶ login ──▶ MemberAccessToken
//!                                                                      │
//!                                          get_member_by_access_token ◀┘
//! ```
//!
//! ## 示例
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use community_auth::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> community_auth::Result<()> {
//! let outbox = Arc::new(OutboxTransport::new());
//! let community = Community::new(
//!     Dependencies {
//!         members: Arc::new(InMemoryMemberStore::new()),
//!         applications: Arc::new(InMemoryApplicationStore::new()),
//!         confirmation_codes: Arc::new(InMemoryConfirmationCodeStore::new()),
//!         public_keys: Arc::new(InMemoryPublicKeyStore::new()),
//!         access_tokens: Arc::new(InMemoryAccessTokenStore::new()),
//!         transport: outbox.clone(),
//!     },
//!     CommunityConfig::new().with_signing_key(AccessTokenSigningKey::new(vec![7u8; 1024])?),
//! )?;
//!
//! let email = EmailAddress::new("alice@x.com")?;
//! let alice = community
//!     .sign_up(
//!         Username::new("alice")?,
//!         email.clone(),
//!         Metadata::new(ProperName::new("Alice", "Liddell")?),
//!     )
//!     .await?;
//!
//! community.request_login(&email).await?;
//! let code = outbox.last_sent_to(&email).unwrap();
//! let key = MemberAccessPublicKey::new(&[42u8; 32])?;
//!
//! let token = community.login(&email, &key, &code).await?;
//! let member = community
//!     .get_member_by_access_token(token.signed_token())
//!     .await?;
//! assert_eq!(member.id, alice.id);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod community;
pub mod config;
pub mod error;
pub mod login;
pub mod member;
pub mod observer;
pub mod random;
pub mod token;
pub mod value_objects;

pub use error::{Error, ErrorKind, Result};

// ============================================================================
// 门面与配置导出
// ============================================================================

pub use community::{Community, Dependencies};
pub use config::CommunityConfig;

// ============================================================================
// 实体导出
// ============================================================================

pub use application::{Application, ApplicationId, ApplicationState, ApplicationsQuery};
pub use login::IssuedConfirmationCode;
pub use member::{AccountStatus, Member, MemberId, Metadata};
pub use token::MemberAccessToken;

// ============================================================================
// 随机数生成函数导出
// ============================================================================

pub use random::{
    constant_time_compare, constant_time_compare_str, generate_numeric_code,
    generate_random_bytes,
};

/// 常用类型一次性导入
pub mod prelude {
    pub use crate::application::{
        Application, ApplicationId, ApplicationState, ApplicationStore, ApplicationsQuery,
        InMemoryApplicationStore,
    };
    pub use crate::community::{Community, Dependencies};
    pub use crate::config::CommunityConfig;
    pub use crate::error::{Error, ErrorKind};
    pub use crate::login::{
        ConfirmationCodeStore, InMemoryConfirmationCodeStore, InMemoryPublicKeyStore,
        IssuedConfirmationCode, OutboxTransport, PublicKeyStore, Transport,
    };
    pub use crate::member::{
        AccountStatus, InMemoryMemberStore, Member, MemberId, MemberStore, Metadata,
    };
    pub use crate::observer::MemberObserver;
    pub use crate::token::{AccessTokenStore, InMemoryAccessTokenStore, MemberAccessToken};
    pub use crate::value_objects::{
        AccessTokenSigningKey, Base64String, ConfirmationCode, EmailAddress,
        MemberAccessPublicKey, ProperName, Username,
    };
}
