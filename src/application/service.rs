use std::sync::Arc;

use tracing::{info, warn};

use super::{Application, ApplicationId, ApplicationState, ApplicationStore, ApplicationsQuery};
use crate::error::{ApplicationError, Error, MemberError, Result};
use crate::member::{Member, MemberId, MemberStore};
use crate::observer::{MemberObserver, Observers};
use crate::value_objects::EmailAddress;

/// 社区服务
///
/// 认证申请的提交、审核与查询，以及管理员提升。除了申请人查看自己最近的申请外，
/// 所有查询和审核都需要管理员权限。
pub struct CommunityService {
    members: Arc<dyn MemberStore>,
    applications: Arc<dyn ApplicationStore>,
    approval_observers: Observers,
}

impl CommunityService {
    pub fn new(members: Arc<dyn MemberStore>, applications: Arc<dyn ApplicationStore>) -> Self {
        Self {
            members,
            applications,
            approval_observers: Observers::new(),
        }
    }

    // ========================================================================
    // 申请
    // ========================================================================

    /// 提交认证申请
    ///
    /// 没有历史申请或最近一次被拒绝时才能提交。
    pub async fn apply_for_verification(
        &self,
        member_id: &MemberId,
        application_text: impl Into<String>,
    ) -> Result<Application> {
        if self.members.fetch_by_id(member_id).await?.is_none() {
            return Err(MemberError::NotFound(member_id.to_string()).into());
        }

        if let Some(last) = self.applications.fetch_last(member_id).await? {
            match last.state {
                ApplicationState::Pending => {
                    return Err(ApplicationError::PendingApplicationExists.into());
                }
                ApplicationState::Approved => {
                    return Err(ApplicationError::AlreadyVerified.into());
                }
                ApplicationState::Rejected => {}
            }
        }

        let application = Application::new(*member_id, application_text);
        self.applications.save(&application).await?;

        info!(
            member_id = %member_id,
            application_id = %application.id,
            "verification application submitted"
        );
        Ok(application)
    }

    // ========================================================================
    // 审核
    // ========================================================================

    /// 通过申请，申请人成为社区认证成员
    pub async fn approve_application(
        &self,
        application_id: &ApplicationId,
        reviewer_id: &MemberId,
    ) -> Result<()> {
        let reviewer = self.require_admin(reviewer_id).await?;
        let mut application = self.fetch_application(application_id).await?;

        application.approve(reviewer.id)?;

        let mut member = self
            .members
            .fetch_by_id(&application.member_id)
            .await?
            .ok_or_else(|| MemberError::NotFound(application.member_id.to_string()))?;

        self.applications.save(&application).await?;

        member.verified = true;
        self.members.save(&member).await?;

        info!(
            application_id = %application.id,
            member_id = %member.id,
            reviewer_id = %reviewer.id,
            "verification application approved"
        );
        self.approval_observers.notify(&member);

        Ok(())
    }

    /// 拒绝申请；申请人之后可以重新提交
    pub async fn reject_application(
        &self,
        application_id: &ApplicationId,
        reason: impl Into<String>,
        reviewer_id: &MemberId,
    ) -> Result<()> {
        let reviewer = self.require_admin(reviewer_id).await?;
        let mut application = self.fetch_application(application_id).await?;

        application.reject(reviewer.id, reason)?;
        self.applications.save(&application).await?;

        info!(
            application_id = %application.id,
            member_id = %application.member_id,
            reviewer_id = %reviewer.id,
            "verification application rejected"
        );
        Ok(())
    }

    // ========================================================================
    // 查询
    // ========================================================================

    pub async fn applications(
        &self,
        query: &ApplicationsQuery,
        requester_id: &MemberId,
    ) -> Result<Vec<Application>> {
        self.require_admin(requester_id).await?;
        self.applications.fetch_by_query(query).await
    }

    pub async fn application(
        &self,
        application_id: &ApplicationId,
        requester_id: &MemberId,
    ) -> Result<Application> {
        self.require_admin(requester_id).await?;
        self.fetch_application(application_id).await
    }

    /// 成员最近一次提交的申请
    ///
    /// 申请人本人或管理员可以查看。
    pub async fn get_last_application(
        &self,
        member_id: &MemberId,
        requester_id: &MemberId,
    ) -> Result<Application> {
        let requester = self
            .members
            .fetch_by_id(requester_id)
            .await?
            .ok_or_else(|| MemberError::NotFound(requester_id.to_string()))?;

        if requester.id != *member_id && !requester.admin {
            warn!(
                requester_id = %requester.id,
                member_id = %member_id,
                "access to another member's application denied"
            );
            return Err(Error::InsufficientPermissions);
        }

        self.applications
            .fetch_last(member_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("last of member {}", member_id)).into())
    }

    /// 按 ID 获取申请，不做权限检查
    ///
    /// 仅供受信任的适配层使用。
    pub async fn application_by_id(&self, application_id: &ApplicationId) -> Result<Application> {
        self.fetch_application(application_id).await
    }

    // ========================================================================
    // 管理员
    // ========================================================================

    /// 将成员提升为管理员（同时标记为已认证）
    ///
    /// 只有成员此前未认证时才通知审核通过观察者。
    pub async fn promote(&self, email_address: &EmailAddress) -> Result<Member> {
        let mut member = self
            .members
            .fetch_by_email(email_address)
            .await?
            .ok_or_else(|| MemberError::NotFound(email_address.to_string()))?;

        let already_verified = member.verified;
        member.verified = true;
        member.admin = true;
        self.members.save(&member).await?;

        info!(member_id = %member.id, already_verified, "member promoted to admin");
        if !already_verified {
            self.approval_observers.notify(&member);
        }

        Ok(member)
    }

    /// 注册审核通过观察者
    pub fn on_application_approved(&self, observer: impl MemberObserver + 'static) {
        self.approval_observers.register(observer);
    }

    async fn require_admin(&self, member_id: &MemberId) -> Result<Member> {
        let member = self
            .members
            .fetch_by_id(member_id)
            .await?
            .ok_or_else(|| MemberError::NotFound(member_id.to_string()))?;

        if !member.admin {
            warn!(member_id = %member.id, "admin operation denied");
            return Err(Error::InsufficientPermissions);
        }

        Ok(member)
    }

    async fn fetch_application(&self, application_id: &ApplicationId) -> Result<Application> {
        self.applications
            .fetch_by_id(application_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(application_id.to_string()).into())
    }
}

impl std::fmt::Debug for CommunityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunityService")
            .field("approval_observers", &self.approval_observers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::InMemoryApplicationStore;
    use crate::member::{InMemoryMemberStore, Metadata};
    use crate::value_objects::{ProperName, Username};
    use std::sync::Mutex;

    struct Fixture {
        service: CommunityService,
        members: Arc<InMemoryMemberStore>,
        applications: Arc<InMemoryApplicationStore>,
    }

    fn fixture() -> Fixture {
        let members = Arc::new(InMemoryMemberStore::new());
        let applications = Arc::new(InMemoryApplicationStore::new());
        Fixture {
            service: CommunityService::new(members.clone(), applications.clone()),
            members,
            applications,
        }
    }

    async fn add_member(f: &Fixture, username: &str, admin: bool) -> Member {
        let mut member = Member::new(
            Username::new(username).unwrap(),
            EmailAddress::new(&format!("{}@x.com", username)).unwrap(),
            Metadata::new(ProperName::new("Test", "Member").unwrap()),
        );
        member.admin = admin;
        f.members.save(&member).await.unwrap();
        member
    }

    fn approvals(service: &CommunityService) -> Arc<Mutex<Vec<MemberId>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        service.on_application_approved(move |m: &Member| sink.lock().unwrap().push(m.id));
        seen
    }

    #[tokio::test]
    async fn test_apply_creates_pending_application() {
        let f = fixture();
        let alice = add_member(&f, "alice", false).await;

        let application = f
            .service
            .apply_for_verification(&alice.id, "I organise the meetups")
            .await
            .unwrap();

        assert_eq!(application.member_id, alice.id);
        assert_eq!(application.state, ApplicationState::Pending);
        assert_eq!(f.applications.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_for_unknown_member() {
        let f = fixture();
        let result = f
            .service
            .apply_for_verification(&MemberId::new(), "hello")
            .await;

        assert!(matches!(result, Err(Error::Member(MemberError::NotFound(_)))));
        assert!(f.applications.is_empty());
    }

    #[tokio::test]
    async fn test_apply_state_machine() {
        let f = fixture();
        let admin = add_member(&f, "root", true).await;
        let alice = add_member(&f, "alice", false).await;

        let first = f
            .service
            .apply_for_verification(&alice.id, "first")
            .await
            .unwrap();
        assert!(matches!(
            f.service.apply_for_verification(&alice.id, "again").await,
            Err(Error::Application(ApplicationError::PendingApplicationExists))
        ));

        f.service
            .reject_application(&first.id, "tell us more", &admin.id)
            .await
            .unwrap();
        let second = f
            .service
            .apply_for_verification(&alice.id, "second")
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert!(second.is_pending());

        f.service
            .approve_application(&second.id, &admin.id)
            .await
            .unwrap();
        assert!(matches!(
            f.service.apply_for_verification(&alice.id, "third").await,
            Err(Error::Application(ApplicationError::AlreadyVerified))
        ));
        assert_eq!(f.applications.len(), 2);
    }

    #[tokio::test]
    async fn test_approve_sets_verified_and_notifies_once() {
        let f = fixture();
        let seen = approvals(&f.service);
        let admin = add_member(&f, "root", true).await;
        let alice = add_member(&f, "alice", false).await;
        let application = f
            .service
            .apply_for_verification(&alice.id, "please")
            .await
            .unwrap();

        f.service
            .approve_application(&application.id, &admin.id)
            .await
            .unwrap();
        assert!(matches!(
            f.service
                .approve_application(&application.id, &admin.id)
                .await,
            Err(Error::Application(ApplicationError::AlreadyReviewed))
        ));

        let stored = f
            .applications
            .fetch_by_id(&application.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state, ApplicationState::Approved);
        assert_eq!(stored.reviewed_by, Some(admin.id));
        assert!(stored.reviewed_at.is_some());

        assert!(f.members.fetch_by_id(&alice.id).await.unwrap().unwrap().verified);
        assert_eq!(*seen.lock().unwrap(), vec![alice.id]);
    }

    #[tokio::test]
    async fn test_reject_leaves_member_unverified() {
        let f = fixture();
        let seen = approvals(&f.service);
        let admin = add_member(&f, "root", true).await;
        let alice = add_member(&f, "alice", false).await;
        let application = f
            .service
            .apply_for_verification(&alice.id, "please")
            .await
            .unwrap();

        f.service
            .reject_application(&application.id, "not yet", &admin.id)
            .await
            .unwrap();
        assert!(matches!(
            f.service
                .reject_application(&application.id, "still no", &admin.id)
                .await,
            Err(Error::Application(ApplicationError::AlreadyReviewed))
        ));

        let stored = f
            .applications
            .fetch_by_id(&application.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state, ApplicationState::Rejected);
        assert_eq!(stored.rejection_reason.as_deref(), Some("not yet"));
        assert!(!f.members.fetch_by_id(&alice.id).await.unwrap().unwrap().verified);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_requires_admin() {
        let f = fixture();
        let alice = add_member(&f, "alice", false).await;
        let bob = add_member(&f, "bob", false).await;
        let application = f
            .service
            .apply_for_verification(&alice.id, "please")
            .await
            .unwrap();

        assert!(matches!(
            f.service.approve_application(&application.id, &bob.id).await,
            Err(Error::InsufficientPermissions)
        ));
        assert!(matches!(
            f.service
                .reject_application(&application.id, "no", &alice.id)
                .await,
            Err(Error::InsufficientPermissions)
        ));
        assert!(matches!(
            f.service
                .approve_application(&application.id, &MemberId::new())
                .await,
            Err(Error::Member(MemberError::NotFound(_)))
        ));
        assert!(
            f.applications
                .fetch_by_id(&application.id)
                .await
                .unwrap()
                .unwrap()
                .is_pending()
        );
    }

    #[tokio::test]
    async fn test_approve_unknown_application() {
        let f = fixture();
        let admin = add_member(&f, "root", true).await;

        assert!(matches!(
            f.service
                .approve_application(&ApplicationId::new(), &admin.id)
                .await,
            Err(Error::Application(ApplicationError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_queries_are_admin_gated() {
        let f = fixture();
        let admin = add_member(&f, "root", true).await;
        let alice = add_member(&f, "alice", false).await;
        let application = f
            .service
            .apply_for_verification(&alice.id, "please")
            .await
            .unwrap();

        assert!(matches!(
            f.service
                .applications(&ApplicationsQuery::new(), &alice.id)
                .await,
            Err(Error::InsufficientPermissions)
        ));
        assert!(matches!(
            f.service.application(&application.id, &alice.id).await,
            Err(Error::InsufficientPermissions)
        ));

        let listed = f
            .service
            .applications(&ApplicationsQuery::new(), &admin.id)
            .await
            .unwrap();
        assert_eq!(listed, vec![application.clone()]);
        assert_eq!(
            f.service
                .application(&application.id, &admin.id)
                .await
                .unwrap(),
            application
        );
        assert_eq!(
            f.service.application_by_id(&application.id).await.unwrap(),
            application
        );
    }

    #[tokio::test]
    async fn test_get_last_application_access() {
        let f = fixture();
        let admin = add_member(&f, "root", true).await;
        let alice = add_member(&f, "alice", false).await;
        let bob = add_member(&f, "bob", false).await;

        assert!(matches!(
            f.service.get_last_application(&alice.id, &alice.id).await,
            Err(Error::Application(ApplicationError::NotFound(_)))
        ));

        let application = f
            .service
            .apply_for_verification(&alice.id, "please")
            .await
            .unwrap();

        assert_eq!(
            f.service
                .get_last_application(&alice.id, &alice.id)
                .await
                .unwrap(),
            application
        );
        assert_eq!(
            f.service
                .get_last_application(&alice.id, &admin.id)
                .await
                .unwrap(),
            application
        );
        assert!(matches!(
            f.service.get_last_application(&alice.id, &bob.id).await,
            Err(Error::InsufficientPermissions)
        ));
        assert!(matches!(
            f.service
                .get_last_application(&alice.id, &MemberId::new())
                .await,
            Err(Error::Member(MemberError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_promote_notifies_only_when_newly_verified() {
        let f = fixture();
        let seen = approvals(&f.service);
        let alice = add_member(&f, "alice", false).await;

        let promoted = f.service.promote(&alice.email_address).await.unwrap();
        assert!(promoted.verified);
        assert!(promoted.admin);

        f.service.promote(&alice.email_address).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![alice.id]);

        let stored = f.members.fetch_by_id(&alice.id).await.unwrap().unwrap();
        assert!(stored.verified && stored.admin);
    }

    #[tokio::test]
    async fn test_promote_unknown_member() {
        let f = fixture();
        assert!(matches!(
            f.service
                .promote(&EmailAddress::new("nobody@x.com").unwrap())
                .await,
            Err(Error::Member(MemberError::NotFound(_)))
        ));
    }
}
