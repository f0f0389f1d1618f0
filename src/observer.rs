//! 成员事件观察者
//!
//! 登录成功、申请通过等事件在所有状态变更持久化之后同步通知观察者，
//! 按注册顺序依次调用。观察者不能影响触发它的操作的结果。
//!
//! 任何 `Fn(&Member) + Send + Sync` 闭包都自动实现 [`MemberObserver`]：
//!
//! ```rust
//! use community_auth::observer::Observers;
//!
//! let observers = Observers::new();
//! observers.register(|member: &community_auth::member::Member| {
//!     println!("welcome {}", member.username);
//! });
//! assert_eq!(observers.len(), 1);
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::member::Member;

/// 成员事件观察者
pub trait MemberObserver: Send + Sync {
    /// 事件发生后调用，传入更新后的成员
    fn notify(&self, member: &Member);
}

impl<F> MemberObserver for F
where
    F: Fn(&Member) + Send + Sync,
{
    fn notify(&self, member: &Member) {
        self(member)
    }
}

/// 只追加的观察者列表
///
/// 注册很少、通知频繁，因此使用读写锁；通知时先复制快照再在锁外调用，
/// 观察者内部再注册新的观察者也不会死锁。
#[derive(Default)]
pub struct Observers {
    observers: RwLock<Vec<Arc<dyn MemberObserver>>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册观察者；重复注册不去重
    pub fn register(&self, observer: impl MemberObserver + 'static) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    /// 按注册顺序通知所有观察者
    pub fn notify(&self, member: &Member) {
        let snapshot: Vec<Arc<dyn MemberObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        debug!(member_id = %member.id, observers = snapshot.len(), "notifying observers");
        for observer in snapshot {
            observer.notify(member);
        }
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.len())
            .finish()
    }
}
