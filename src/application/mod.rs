//! 社区认证申请模块
//!
//! 成员提交认证申请，由管理员审核通过或拒绝。
//!
//! ## 状态机
//!
//! ```text
//! Pending ──approve──▶ Approved（终态，不能再次申请）
//!    │
//!    └────reject────▶ Rejected（可以重新提交，产生新的 Pending 申请）
//! ```
//!
//! 每个申请只会被审核一次：对非 `Pending` 的申请调用 [`Application::approve`]
//! 或 [`Application::reject`] 都会返回 [`ApplicationError::AlreadyReviewed`]。

mod service;
mod store;

pub use service::CommunityService;
pub use store::{ApplicationStore, InMemoryApplicationStore};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApplicationError, Error, Result, ValidationError};
use crate::member::MemberId;

/// 申请标识符
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ApplicationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ValidationError::InvalidIdentifier(s.to_string()))
    }
}

/// 申请状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ApplicationState {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationState::Pending => "Pending",
            ApplicationState::Approved => "Approved",
            ApplicationState::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 从持久化的字符串恢复状态；未知取值是数据完整性错误
impl FromStr for ApplicationState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(ApplicationState::Pending),
            "Approved" => Ok(ApplicationState::Approved),
            "Rejected" => Ok(ApplicationState::Rejected),
            other => Err(Error::integrity(format!(
                "application state: '{}' is invalid",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ApplicationState {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ApplicationState> for String {
    fn from(value: ApplicationState) -> Self {
        value.as_str().to_string()
    }
}

/// 认证申请
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    /// 申请人
    pub member_id: MemberId,
    pub application_text: String,
    pub state: ApplicationState,
    pub created_at: DateTime<Utc>,
    /// 审核人（通过或拒绝）
    pub reviewed_by: Option<MemberId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Application {
    /// 创建一个新的待审核申请
    pub fn new(member_id: MemberId, application_text: impl Into<String>) -> Self {
        Self {
            id: ApplicationId::new(),
            member_id,
            application_text: application_text.into(),
            state: ApplicationState::Pending,
            created_at: Utc::now(),
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == ApplicationState::Pending
    }

    pub fn approve(&mut self, reviewer: MemberId) -> Result<()> {
        self.resolve(ApplicationState::Approved, reviewer)
    }

    pub fn reject(&mut self, reviewer: MemberId, reason: impl Into<String>) -> Result<()> {
        self.resolve(ApplicationState::Rejected, reviewer)?;
        self.rejection_reason = Some(reason.into());
        Ok(())
    }

    fn resolve(&mut self, state: ApplicationState, reviewer: MemberId) -> Result<()> {
        if !self.is_pending() {
            return Err(ApplicationError::AlreadyReviewed.into());
        }

        self.state = state;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }
}

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// 申请列表查询
///
/// 游标分页：`position` 是上一页最后一条申请的 ID，结果从它之后开始。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationsQuery {
    pub position: Option<ApplicationId>,
    pub limit: usize,
    pub state: Option<ApplicationState>,
}

impl Default for ApplicationsQuery {
    fn default() -> Self {
        Self {
            position: None,
            limit: DEFAULT_PAGE_SIZE,
            state: None,
        }
    }
}

impl ApplicationsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从某条申请之后开始
    pub fn after(mut self, position: ApplicationId) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// 只返回指定状态的申请
    pub fn with_state(mut self, state: ApplicationState) -> Self {
        self.state = Some(state);
        self
    }
}
