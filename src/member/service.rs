use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{Member, MemberId, MemberStore, Metadata};
use crate::config::timestamp_after;
use crate::error::{Error, LoginError, MemberError, Result};
use crate::login::{ConfirmationCodeStore, IssuedConfirmationCode, PublicKeyStore, Transport};
use crate::observer::{MemberObserver, Observers};
use crate::token::{AccessTokenService, MemberAccessToken};
use crate::value_objects::{ConfirmationCode, EmailAddress, MemberAccessPublicKey, Username};

/// 验证码默认有效期：30 分钟
pub const DEFAULT_CONFIRMATION_CODE_TTL: Duration = Duration::from_secs(30 * 60);

/// 登录请求默认冷却时间：120 秒
pub const DEFAULT_REQUEST_LOGIN_COOL_DOWN: Duration = Duration::from_secs(120);

/// 成员服务
///
/// 负责注册、请求验证码、验证码登录以及 Access Token 到成员的解析。
pub struct MemberService {
    members: Arc<dyn MemberStore>,
    confirmation_codes: Arc<dyn ConfirmationCodeStore>,
    public_keys: Arc<dyn PublicKeyStore>,
    transport: Arc<dyn Transport>,
    access_tokens: Arc<AccessTokenService>,
    confirmation_code_ttl: Duration,
    request_login_cool_down: Duration,
    login_observers: Observers,
}

impl MemberService {
    pub fn new(
        members: Arc<dyn MemberStore>,
        confirmation_codes: Arc<dyn ConfirmationCodeStore>,
        public_keys: Arc<dyn PublicKeyStore>,
        transport: Arc<dyn Transport>,
        access_tokens: Arc<AccessTokenService>,
    ) -> Self {
        Self {
            members,
            confirmation_codes,
            public_keys,
            transport,
            access_tokens,
            confirmation_code_ttl: DEFAULT_CONFIRMATION_CODE_TTL,
            request_login_cool_down: DEFAULT_REQUEST_LOGIN_COOL_DOWN,
            login_observers: Observers::new(),
        }
    }

    /// 设置验证码有效期
    pub fn with_confirmation_code_ttl(mut self, ttl: Duration) -> Self {
        self.confirmation_code_ttl = ttl;
        self
    }

    /// 设置登录请求冷却时间
    pub fn with_request_login_cool_down(mut self, cool_down: Duration) -> Self {
        self.request_login_cool_down = cool_down;
        self
    }

    pub fn access_tokens(&self) -> &AccessTokenService {
        &self.access_tokens
    }

    // ========================================================================
    // 注册
    // ========================================================================

    /// 注册新成员
    ///
    /// 用户名和邮箱必须都未被占用；新成员的所有标志位均为 `false`。
    pub async fn sign_up(
        &self,
        username: Username,
        email_address: EmailAddress,
        metadata: Metadata,
    ) -> Result<Member> {
        if self.members.is_username_taken(&username).await? {
            warn!(username = %username, "sign up rejected: username taken");
            return Err(MemberError::UsernameTaken(username.to_string()).into());
        }

        if self.members.is_email_address_taken(&email_address).await? {
            warn!("sign up rejected: email address taken");
            return Err(MemberError::EmailAddressTaken(email_address.to_string()).into());
        }

        let member = Member::new(username, email_address, metadata);
        self.members.save(&member).await?;

        info!(member_id = %member.id, username = %member.username, "member signed up");
        Ok(member)
    }

    // ========================================================================
    // 登录
    // ========================================================================

    /// 为邮箱签发新的验证码并投递
    ///
    /// 距离上一次签发不足冷却时间时返回 [`Error::RequestLoginCoolDown`]。
    /// 投递失败时验证码已经保存，错误原样返回。
    pub async fn request_login(&self, email_address: &EmailAddress) -> Result<()> {
        let member = self
            .members
            .fetch_by_email(email_address)
            .await?
            .ok_or_else(|| MemberError::NotFound(email_address.to_string()))?;

        let now = Utc::now().timestamp();

        if let Some(last) = self.confirmation_codes.last(email_address).await? {
            let try_again_at = timestamp_after(last.issued_at, self.request_login_cool_down);
            if now < try_again_at {
                debug!(member_id = %member.id, try_again_at, "request login within cool down");
                return Err(Error::RequestLoginCoolDown { try_again_at });
            }
        }

        let code = ConfirmationCode::generate()?;
        let issued = IssuedConfirmationCode::new(member.id, email_address.clone(), code, now);
        self.confirmation_codes.save(&issued).await?;

        self.transport.send_confirmation_code(&issued).await?;

        info!(member_id = %member.id, code_id = %issued.id, "confirmation code issued");
        Ok(())
    }

    /// 使用验证码和新的公钥登录
    ///
    /// 验证码和公钥在任何其他状态变更之前被标记为已使用；之后的失败不会回滚这两项。
    /// 成功时成员绑定新的公钥和 Token，邮箱标记为已验证，随后按注册顺序通知登录观察者。
    pub async fn login(
        &self,
        email_address: &EmailAddress,
        public_key: &MemberAccessPublicKey,
        code: &ConfirmationCode,
    ) -> Result<MemberAccessToken> {
        let issued = self
            .confirmation_codes
            .fetch(email_address, code)
            .await?
            .ok_or(LoginError::ConfirmationCodeNotFound)?;

        let now = Utc::now().timestamp();
        if issued.is_expired_at(now, self.confirmation_code_ttl) {
            warn!(code_id = %issued.id, "login rejected: confirmation code expired");
            return Err(LoginError::ConfirmationCodeExpired.into());
        }

        if issued.used {
            warn!(code_id = %issued.id, "login rejected: confirmation code already used");
            return Err(LoginError::ConfirmationCodeAlreadyUsed.into());
        }

        if self.public_keys.has_been_used(public_key).await? {
            warn!(code_id = %issued.id, "login rejected: public key already used");
            return Err(LoginError::PublicKeyAlreadyUsed.into());
        }

        if !self.confirmation_codes.mark_used(&issued.id).await? {
            warn!(code_id = %issued.id, "login rejected: confirmation code consumed concurrently");
            return Err(LoginError::ConfirmationCodeAlreadyUsed.into());
        }

        if !self.public_keys.mark_used(public_key).await? {
            warn!(code_id = %issued.id, "login rejected: public key consumed concurrently");
            return Err(LoginError::PublicKeyAlreadyUsed.into());
        }

        let mut member = self
            .members
            .fetch_by_email(email_address)
            .await?
            .ok_or_else(|| MemberError::NotFound(email_address.to_string()))?;

        if member.id != issued.member_id {
            warn!(
                member_id = %member.id,
                code_member_id = %issued.member_id,
                "login rejected: confirmation code bound to another member"
            );
            return Err(LoginError::ConfirmationCodeMemberMismatch.into());
        }

        let token = self.access_tokens.issue(&member).await?;

        member.public_key = Some(*public_key);
        member.verified_email_address = true;
        member.access_token_id = Some(token.id);
        self.members.save(&member).await?;

        info!(member_id = %member.id, token_id = %token.id, "member logged in");
        self.login_observers.notify(&member);

        Ok(token)
    }

    // ========================================================================
    // 查询
    // ========================================================================

    /// 解析 Access Token 并返回其持有者
    pub async fn get_by_access_token(&self, signed_token: &str) -> Result<Member> {
        let token = self.access_tokens.parse(signed_token)?;

        self.members
            .fetch_by_id(&token.subject)
            .await?
            .ok_or_else(|| MemberError::NoMemberForAccessToken.into())
    }

    pub async fn get_member_by_id(&self, id: &MemberId) -> Result<Member> {
        self.members
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| MemberError::NotFound(id.to_string()).into())
    }

    /// 注册登录观察者
    pub fn on_login(&self, observer: impl MemberObserver + 'static) {
        self.login_observers.register(observer);
    }
}

impl std::fmt::Debug for MemberService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberService")
            .field("confirmation_code_ttl", &self.confirmation_code_ttl)
            .field("request_login_cool_down", &self.request_login_cool_down)
            .field("login_observers", &self.login_observers)
            .finish_non_exhaustive()
    }
}
