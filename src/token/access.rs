use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::jwt::{AccessTokenClaims, JwtCodec};
use crate::config::timestamp_after;
use crate::error::{Error, Result, TokenError, ValidationError};
use crate::member::{Member, MemberId};
use crate::value_objects::AccessTokenSigningKey;

// ============================================================================
// Token 描述
// ============================================================================

/// 已签名的成员 Access Token
#[derive(Clone, PartialEq, Eq)]
pub struct MemberAccessToken {
    /// Token ID（JWT `jti`）
    pub id: Uuid,
    /// 持有者
    pub subject: MemberId,
    /// 签发时间（Unix 时间戳，秒）
    pub issued_at: i64,
    /// 过期时间（Unix 时间戳，秒）
    pub expires_at: i64,
    signed: String,
}

impl MemberAccessToken {
    /// 签名后的 JWT 字符串，作为 Bearer 凭证交给客户端
    pub fn signed_token(&self) -> &str {
        &self.signed
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }

    /// 审计记录（不含签名字符串）
    pub fn record(&self) -> AccessTokenRecord {
        AccessTokenRecord {
            id: self.id,
            subject: self.subject,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

impl std::fmt::Debug for MemberAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberAccessToken")
            .field("id", &self.id)
            .field("subject", &self.subject)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// 已签发 Token 的审计记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenRecord {
    pub id: Uuid,
    pub subject: MemberId,
    pub issued_at: i64,
    pub expires_at: i64,
}

// ============================================================================
// 存储接口
// ============================================================================

/// 已签发 Token 的存储接口
///
/// 仅用于审计，校验 Token 时不会查询。
#[async_trait]
pub trait AccessTokenStore: Send + Sync {
    async fn save(&self, record: &AccessTokenRecord) -> Result<()>;
}

/// 内存存储实现
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccessTokenStore {
    records: Arc<RwLock<HashMap<Uuid, AccessTokenRecord>>>,
}

impl InMemoryAccessTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<AccessTokenRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// 某个成员的全部签发记录
    pub fn records_for(&self, subject: &MemberId) -> Vec<AccessTokenRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|record| &record.subject == subject)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccessTokenStore for InMemoryAccessTokenStore {
    async fn save(&self, record: &AccessTokenRecord) -> Result<()> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id, record.clone());
        Ok(())
    }
}

// ============================================================================
// 服务
// ============================================================================

/// Access Token 签发与解析
pub struct AccessTokenService {
    codec: JwtCodec,
    ttl: Duration,
    store: Arc<dyn AccessTokenStore>,
}

impl AccessTokenService {
    pub fn new(
        signing_key: &AccessTokenSigningKey,
        ttl: Duration,
        store: Arc<dyn AccessTokenStore>,
    ) -> Self {
        Self {
            codec: JwtCodec::new(signing_key),
            ttl,
            store,
        }
    }

    /// Token 有效期
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 为成员签发新的 Access Token 并保存审计记录
    pub async fn issue(&self, member: &Member) -> Result<MemberAccessToken> {
        if member.id.is_nil() {
            return Err(ValidationError::InvalidIdentifier(member.id.to_string()).into());
        }

        let id = Uuid::new_v4();
        let issued_at = Utc::now().timestamp();
        let expires_at = timestamp_after(issued_at, self.ttl);

        let claims = AccessTokenClaims {
            sub: member.id.to_string(),
            jti: id.to_string(),
            iat: issued_at,
            exp: expires_at,
        };
        let signed = self.codec.encode(&claims)?;

        let token = MemberAccessToken {
            id,
            subject: member.id,
            issued_at,
            expires_at,
            signed,
        };
        self.store.save(&token.record()).await?;

        debug!(member_id = %member.id, token_id = %id, expires_at, "access token issued");
        Ok(token)
    }

    /// 校验签名与有效期，解析出 Token 描述
    ///
    /// 不查询存储，也不检查成员是否存在。
    pub fn parse(&self, signed_token: &str) -> Result<MemberAccessToken> {
        let claims = self.codec.decode(signed_token)?;

        let subject = MemberId::from_str(&claims.sub).map_err(|_| {
            Error::Token(TokenError::InvalidClaim(format!(
                "subject is not a member id: {}",
                claims.sub
            )))
        })?;
        let id = Uuid::parse_str(&claims.jti).map_err(|_| {
            Error::Token(TokenError::InvalidClaim(format!(
                "token id is not a uuid: {}",
                claims.jti
            )))
        })?;

        Ok(MemberAccessToken {
            id,
            subject,
            issued_at: claims.iat,
            expires_at: claims.exp,
            signed: signed_token.to_string(),
        })
    }
}

impl std::fmt::Debug for AccessTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
