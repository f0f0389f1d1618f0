use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::{Application, ApplicationId, ApplicationsQuery};
use crate::error::{Result, StorageError};
use crate::member::MemberId;

/// 认证申请存储接口
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// 获取成员最近提交的申请
    async fn fetch_last(&self, member_id: &MemberId) -> Result<Option<Application>>;

    async fn fetch_by_id(&self, id: &ApplicationId) -> Result<Option<Application>>;

    /// 保存申请（不存在则插入，存在则覆盖）
    async fn save(&self, application: &Application) -> Result<()>;

    /// 分页查询
    ///
    /// 顺序必须稳定：没有并发写入时，连续翻页既不重复也不遗漏。
    async fn fetch_by_query(&self, query: &ApplicationsQuery) -> Result<Vec<Application>>;
}

/// 内存存储实现
///
/// 按提交顺序保存，分页按提交顺序进行。
#[derive(Debug, Clone, Default)]
pub struct InMemoryApplicationStore {
    applications: Arc<RwLock<Vec<Application>>>,
}

impl InMemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.applications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn fetch_last(&self, member_id: &MemberId) -> Result<Option<Application>> {
        let applications = self
            .applications
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(applications
            .iter()
            .rev()
            .find(|application| &application.member_id == member_id)
            .cloned())
    }

    async fn fetch_by_id(&self, id: &ApplicationId) -> Result<Option<Application>> {
        let applications = self
            .applications
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(applications
            .iter()
            .find(|application| &application.id == id)
            .cloned())
    }

    async fn save(&self, application: &Application) -> Result<()> {
        let mut applications = self
            .applications
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match applications
            .iter_mut()
            .find(|existing| existing.id == application.id)
        {
            Some(existing) => *existing = application.clone(),
            None => applications.push(application.clone()),
        }
        Ok(())
    }

    async fn fetch_by_query(&self, query: &ApplicationsQuery) -> Result<Vec<Application>> {
        let applications = self
            .applications
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let start = match query.position {
            Some(position) => {
                applications
                    .iter()
                    .position(|application| application.id == position)
                    .ok_or_else(|| {
                        StorageError::NotFound(format!("application position {}", position))
                    })?
                    + 1
            }
            None => 0,
        };

        Ok(applications[start..]
            .iter()
            .filter(|application| query.state.is_none_or(|state| application.state == state))
            .take(query.limit)
            .cloned()
            .collect())
    }
}
