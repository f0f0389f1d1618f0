//! 社区门面
//!
//! [`Community`] 把 [`MemberService`] 和 [`CommunityService`] 组装在一起，
//! 对外暴露全部操作。适配层（HTTP、GraphQL、CLI）只需要持有一个 `Community`。
//!
//! ## 示例
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use community_auth::community::{Community, Dependencies};
//! use community_auth::config::CommunityConfig;
//! use community_auth::login::{
//!     InMemoryConfirmationCodeStore, InMemoryPublicKeyStore, OutboxTransport,
//! };
//! use community_auth::member::{InMemoryMemberStore, Metadata};
//! use community_auth::application::InMemoryApplicationStore;
//! use community_auth::token::InMemoryAccessTokenStore;
//! use community_auth::value_objects::{AccessTokenSigningKey, EmailAddress, ProperName, Username};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dependencies = Dependencies {
//!     members: Arc::new(InMemoryMemberStore::new()),
//!     applications: Arc::new(InMemoryApplicationStore::new()),
//!     confirmation_codes: Arc::new(InMemoryConfirmationCodeStore::new()),
//!     public_keys: Arc::new(InMemoryPublicKeyStore::new()),
//!     access_tokens: Arc::new(InMemoryAccessTokenStore::new()),
//!     transport: Arc::new(OutboxTransport::new()),
//! };
//! let config = CommunityConfig::new()
//!     .with_signing_key(AccessTokenSigningKey::new(vec![7u8; 1024]).unwrap());
//! let community = Community::new(dependencies, config).unwrap();
//!
//! let alice = community
//!     .sign_up(
//!         Username::new("alice").unwrap(),
//!         EmailAddress::new("alice@x.com").unwrap(),
//!         Metadata::new(ProperName::new("Alice", "Liddell").unwrap()),
//!     )
//!     .await
//!     .unwrap();
//! assert!(!alice.verified);
//! # }
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::application::{
    Application, ApplicationId, ApplicationStore, ApplicationsQuery, CommunityService,
};
use crate::config::CommunityConfig;
use crate::error::Result;
use crate::login::{ConfirmationCodeStore, PublicKeyStore, Transport};
use crate::member::{Member, MemberId, MemberService, MemberStore, Metadata};
use crate::observer::MemberObserver;
use crate::token::{AccessTokenService, AccessTokenStore, MemberAccessToken};
use crate::value_objects::{ConfirmationCode, EmailAddress, MemberAccessPublicKey, Username};

/// 外部协作方
///
/// 所有存储和投递实现都通过 trait 对象注入。
#[derive(Clone)]
pub struct Dependencies {
    pub members: Arc<dyn MemberStore>,
    pub applications: Arc<dyn ApplicationStore>,
    pub confirmation_codes: Arc<dyn ConfirmationCodeStore>,
    pub public_keys: Arc<dyn PublicKeyStore>,
    pub access_tokens: Arc<dyn AccessTokenStore>,
    pub transport: Arc<dyn Transport>,
}

/// 社区门面
#[derive(Debug)]
pub struct Community {
    member_service: MemberService,
    community_service: CommunityService,
}

impl Community {
    /// 组装服务
    ///
    /// 配置中缺少签名密钥时返回 [`crate::error::ConfigError::MissingRequired`]。
    pub fn new(dependencies: Dependencies, config: CommunityConfig) -> Result<Self> {
        let signing_key = config.require_signing_key()?;

        let access_tokens = Arc::new(AccessTokenService::new(
            signing_key,
            config.access_token_ttl,
            dependencies.access_tokens,
        ));

        let member_service = MemberService::new(
            dependencies.members.clone(),
            dependencies.confirmation_codes,
            dependencies.public_keys,
            dependencies.transport,
            access_tokens,
        )
        .with_confirmation_code_ttl(config.confirmation_code_ttl)
        .with_request_login_cool_down(config.request_login_cool_down);

        let community_service =
            CommunityService::new(dependencies.members, dependencies.applications);

        debug!(
            access_token_ttl = ?config.access_token_ttl,
            confirmation_code_ttl = ?config.confirmation_code_ttl,
            request_login_cool_down = ?config.request_login_cool_down,
            "community initialised"
        );

        Ok(Self {
            member_service,
            community_service,
        })
    }

    pub fn members(&self) -> &MemberService {
        &self.member_service
    }

    pub fn community_service(&self) -> &CommunityService {
        &self.community_service
    }

    // ========================================================================
    // 成员
    // ========================================================================

    pub async fn sign_up(
        &self,
        username: Username,
        email_address: EmailAddress,
        metadata: Metadata,
    ) -> Result<Member> {
        self.member_service
            .sign_up(username, email_address, metadata)
            .await
    }

    pub async fn request_login(&self, email_address: &EmailAddress) -> Result<()> {
        self.member_service.request_login(email_address).await
    }

    pub async fn login(
        &self,
        email_address: &EmailAddress,
        public_key: &MemberAccessPublicKey,
        code: &ConfirmationCode,
    ) -> Result<MemberAccessToken> {
        self.member_service
            .login(email_address, public_key, code)
            .await
    }

    pub async fn get_member_by_access_token(&self, signed_token: &str) -> Result<Member> {
        self.member_service.get_by_access_token(signed_token).await
    }

    pub async fn get_member(&self, id: &MemberId) -> Result<Member> {
        self.member_service.get_member_by_id(id).await
    }

    pub fn on_login(&self, observer: impl MemberObserver + 'static) {
        self.member_service.on_login(observer);
    }

    // ========================================================================
    // 认证申请
    // ========================================================================

    pub async fn apply_for_verification(
        &self,
        member_id: &MemberId,
        application_text: impl Into<String>,
    ) -> Result<Application> {
        self.community_service
            .apply_for_verification(member_id, application_text)
            .await
    }

    pub async fn approve_application(
        &self,
        application_id: &ApplicationId,
        reviewer_id: &MemberId,
    ) -> Result<()> {
        self.community_service
            .approve_application(application_id, reviewer_id)
            .await
    }

    pub async fn reject_application(
        &self,
        application_id: &ApplicationId,
        reason: impl Into<String>,
        reviewer_id: &MemberId,
    ) -> Result<()> {
        self.community_service
            .reject_application(application_id, reason, reviewer_id)
            .await
    }

    pub async fn applications(
        &self,
        query: &ApplicationsQuery,
        requester_id: &MemberId,
    ) -> Result<Vec<Application>> {
        self.community_service
            .applications(query, requester_id)
            .await
    }

    pub async fn application(
        &self,
        application_id: &ApplicationId,
        requester_id: &MemberId,
    ) -> Result<Application> {
        self.community_service
            .application(application_id, requester_id)
            .await
    }

    pub async fn get_last_application(
        &self,
        member_id: &MemberId,
        requester_id: &MemberId,
    ) -> Result<Application> {
        self.community_service
            .get_last_application(member_id, requester_id)
            .await
    }

    /// 不做权限检查的按 ID 查询
    pub async fn get_application(&self, application_id: &ApplicationId) -> Result<Application> {
        self.community_service
            .application_by_id(application_id)
            .await
    }

    pub async fn promote(&self, email_address: &EmailAddress) -> Result<Member> {
        self.community_service.promote(email_address).await
    }

    pub fn on_application_approved(&self, observer: impl MemberObserver + 'static) {
        self.community_service.on_application_approved(observer);
    }
}
