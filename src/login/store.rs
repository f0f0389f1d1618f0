use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use super::IssuedConfirmationCode;
use crate::error::Result;
use crate::random::constant_time_compare_str;
use crate::value_objects::{ConfirmationCode, EmailAddress, MemberAccessPublicKey};

// ============================================================================
// 存储接口
// ============================================================================

/// 验证码存储接口
#[async_trait]
pub trait ConfirmationCodeStore: Send + Sync {
    /// 保存验证码记录（不存在则插入，存在则覆盖）
    async fn save(&self, code: &IssuedConfirmationCode) -> Result<()>;

    /// 获取某个邮箱下与给定验证码匹配的最新记录
    async fn fetch(
        &self,
        email_address: &EmailAddress,
        code: &ConfirmationCode,
    ) -> Result<Option<IssuedConfirmationCode>>;

    /// 获取某个邮箱最近签发的记录
    async fn last(&self, email_address: &EmailAddress) -> Result<Option<IssuedConfirmationCode>>;

    /// 原子地将验证码标记为已使用
    ///
    /// 返回 `false` 表示该验证码在此之前已被使用（或不存在）。
    async fn mark_used(&self, id: &Uuid) -> Result<bool>;
}

/// 已使用公钥存储接口
#[async_trait]
pub trait PublicKeyStore: Send + Sync {
    /// 公钥是否已被使用过
    async fn has_been_used(&self, key: &MemberAccessPublicKey) -> Result<bool>;

    /// 原子地记录公钥已被使用
    ///
    /// 返回 `false` 表示该公钥在此之前已被记录。
    async fn mark_used(&self, key: &MemberAccessPublicKey) -> Result<bool>;
}

// ============================================================================
// 内存存储实现
// ============================================================================

/// 验证码的内存存储实现
///
/// 按签发顺序保存所有记录。
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfirmationCodeStore {
    codes: Arc<RwLock<Vec<IssuedConfirmationCode>>>,
}

impl InMemoryConfirmationCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.codes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 某个邮箱下的全部记录（按签发顺序）
    pub fn codes_for(&self, email_address: &EmailAddress) -> Vec<IssuedConfirmationCode> {
        self.codes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|code| &code.email_address == email_address)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ConfirmationCodeStore for InMemoryConfirmationCodeStore {
    async fn save(&self, code: &IssuedConfirmationCode) -> Result<()> {
        let mut codes = self.codes.write().unwrap_or_else(PoisonError::into_inner);
        match codes.iter_mut().find(|existing| existing.id == code.id) {
            Some(existing) => *existing = code.clone(),
            None => codes.push(code.clone()),
        }
        Ok(())
    }

    async fn fetch(
        &self,
        email_address: &EmailAddress,
        code: &ConfirmationCode,
    ) -> Result<Option<IssuedConfirmationCode>> {
        let codes = self.codes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(codes
            .iter()
            .rev()
            .filter(|issued| &issued.email_address == email_address)
            .find(|issued| constant_time_compare_str(issued.code.as_str(), code.as_str()))
            .cloned())
    }

    async fn last(&self, email_address: &EmailAddress) -> Result<Option<IssuedConfirmationCode>> {
        let codes = self.codes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(codes
            .iter()
            .rev()
            .find(|issued| &issued.email_address == email_address)
            .cloned())
    }

    async fn mark_used(&self, id: &Uuid) -> Result<bool> {
        let mut codes = self.codes.write().unwrap_or_else(PoisonError::into_inner);
        match codes.iter_mut().find(|issued| &issued.id == id) {
            Some(issued) if !issued.used => {
                issued.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// 已使用公钥的内存存储实现
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublicKeyStore {
    used: Arc<RwLock<HashSet<MemberAccessPublicKey>>>,
}

impl InMemoryPublicKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.used.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PublicKeyStore for InMemoryPublicKeyStore {
    async fn has_been_used(&self, key: &MemberAccessPublicKey) -> Result<bool> {
        let used = self.used.read().unwrap_or_else(PoisonError::into_inner);
        Ok(used.contains(key))
    }

    async fn mark_used(&self, key: &MemberAccessPublicKey) -> Result<bool> {
        let mut used = self.used.write().unwrap_or_else(PoisonError::into_inner);
        Ok(used.insert(*key))
    }
}
