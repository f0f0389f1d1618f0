use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::{Member, MemberId};
use crate::error::Result;
use crate::value_objects::{EmailAddress, Username};

// ============================================================================
// 存储接口
// ============================================================================

/// 成员存储接口
///
/// 实现此 trait 以提供自定义的存储后端（如 Postgres、Redis 等）。
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// 按 ID 获取成员
    async fn fetch_by_id(&self, id: &MemberId) -> Result<Option<Member>>;

    /// 按邮箱获取成员
    async fn fetch_by_email(&self, email_address: &EmailAddress) -> Result<Option<Member>>;

    /// 保存成员（不存在则插入，存在则覆盖）
    async fn save(&self, member: &Member) -> Result<()>;

    /// 用户名是否已被占用
    async fn is_username_taken(&self, username: &Username) -> Result<bool>;

    /// 邮箱是否已被占用
    async fn is_email_address_taken(&self, email_address: &EmailAddress) -> Result<bool>;
}

// ============================================================================
// 内存存储实现
// ============================================================================

/// 内存存储实现
///
/// 适用于单实例部署或测试环境。
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemberStore {
    members: Arc<RwLock<HashMap<MemberId, Member>>>,
}

impl InMemoryMemberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MemberStore for InMemoryMemberStore {
    async fn fetch_by_id(&self, id: &MemberId) -> Result<Option<Member>> {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        Ok(members.get(id).cloned())
    }

    async fn fetch_by_email(&self, email_address: &EmailAddress) -> Result<Option<Member>> {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        Ok(members
            .values()
            .find(|member| &member.email_address == email_address)
            .cloned())
    }

    async fn save(&self, member: &Member) -> Result<()> {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        members.insert(member.id, member.clone());
        Ok(())
    }

    async fn is_username_taken(&self, username: &Username) -> Result<bool> {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        Ok(members.values().any(|member| &member.username == username))
    }

    async fn is_email_address_taken(&self, email_address: &EmailAddress) -> Result<bool> {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        Ok(members
            .values()
            .any(|member| &member.email_address == email_address))
    }
}
