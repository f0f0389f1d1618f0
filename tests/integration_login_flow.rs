//! 无密码登录集成测试
//!
//! 通过 `Community` 门面和内存存储驱动注册、请求验证码、登录以及 Token 解析的完整流程。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use community_auth::error::{LoginError, MemberError, TokenError};
use community_auth::prelude::*;
use community_auth::random::generate_random_bytes;

// ============================================================================
// 测试环境
// ============================================================================

struct Harness {
    community: Arc<Community>,
    outbox: Arc<OutboxTransport>,
    members: Arc<InMemoryMemberStore>,
    codes: Arc<InMemoryConfirmationCodeStore>,
    keys: Arc<InMemoryPublicKeyStore>,
    tokens: Arc<InMemoryAccessTokenStore>,
}

fn signing_key_env() -> String {
    STANDARD.encode((0..1024u32).map(|i| (i % 255) as u8 + 1).collect::<Vec<u8>>())
}

fn default_config() -> CommunityConfig {
    let encoded = signing_key_env();
    CommunityConfig::from_lookup(move |key| {
        (key == "COMMUNITY_ACCESS_TOKEN_SIGNING_KEY").then(|| encoded.clone())
    })
    .unwrap()
}

fn harness_with(config: CommunityConfig) -> Harness {
    let outbox = Arc::new(OutboxTransport::new());
    let members = Arc::new(InMemoryMemberStore::new());
    let codes = Arc::new(InMemoryConfirmationCodeStore::new());
    let keys = Arc::new(InMemoryPublicKeyStore::new());
    let tokens = Arc::new(InMemoryAccessTokenStore::new());

    let dependencies = Dependencies {
        members: members.clone(),
        applications: Arc::new(InMemoryApplicationStore::new()),
        confirmation_codes: codes.clone(),
        public_keys: keys.clone(),
        access_tokens: tokens.clone(),
        transport: outbox.clone(),
    };

    Harness {
        community: Arc::new(Community::new(dependencies, config).unwrap()),
        outbox,
        members,
        codes,
        keys,
        tokens,
    }
}

fn harness() -> Harness {
    harness_with(default_config())
}

fn email(address: &str) -> EmailAddress {
    EmailAddress::new(address).unwrap()
}

fn fresh_key() -> MemberAccessPublicKey {
    MemberAccessPublicKey::new(&generate_random_bytes(32).unwrap()).unwrap()
}

async fn sign_up(h: &Harness, username: &str) -> Member {
    h.community
        .sign_up(
            Username::new(username).unwrap(),
            email(&format!("{}@x.com", username)),
            Metadata::new(ProperName::new("Test", "Member").unwrap()),
        )
        .await
        .unwrap()
}

async fn request_code(h: &Harness, member: &Member) -> ConfirmationCode {
    h.community
        .request_login(&member.email_address)
        .await
        .unwrap();
    h.outbox.last_sent_to(&member.email_address).unwrap()
}

// ============================================================================
// 完整流程
// ============================================================================

/// 注册 → 请求验证码 → 登录 → 解析 Token
#[tokio::test]
async fn test_end_to_end_login() {
    let h = harness();
    let alice = sign_up(&h, "alice").await;
    assert!(!alice.verified);
    assert!(!alice.admin);
    assert_eq!(alice.status(), AccountStatus::Unverified);

    let code = request_code(&h, &alice).await;
    let key = fresh_key();
    let token = h
        .community
        .login(&alice.email_address, &key, &code)
        .await
        .unwrap();

    let parsed = h
        .community
        .members()
        .access_tokens()
        .parse(token.signed_token())
        .unwrap();
    assert_eq!(parsed.subject, alice.id);
    assert_eq!(parsed.id, token.id);

    let expected_expiry = Utc::now().timestamp() + 20 * 24 * 60 * 60;
    assert!((parsed.expires_at - expected_expiry).abs() <= 5);

    let member = h
        .community
        .get_member_by_access_token(token.signed_token())
        .await
        .unwrap();
    assert_eq!(member.id, alice.id);
    assert_eq!(member.public_key, Some(key));
    assert_eq!(member.access_token_id, Some(token.id));
    assert_eq!(member.status(), AccountStatus::EmailVerified);

    assert_eq!(h.tokens.get(&token.id).unwrap().subject, alice.id);
}

/// 邮箱在注册、请求和登录时统一规范化
#[tokio::test]
async fn test_email_is_normalised() {
    let h = harness();
    let alice = sign_up(&h, "alice").await;

    h.community
        .request_login(&email("  ALICE@X.com "))
        .await
        .unwrap();
    let code = h.outbox.last_sent_to(&alice.email_address).unwrap();

    let token = h
        .community
        .login(&email("Alice@x.COM"), &fresh_key(), &code)
        .await
        .unwrap();
    assert_eq!(token.subject, alice.id);
}

/// 未注册的邮箱不能请求验证码
#[tokio::test]
async fn test_request_login_requires_member() {
    let h = harness();

    let err = h
        .community
        .request_login(&email("nobody@x.com"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.outbox.sent().is_empty());
}

// ============================================================================
// 冷却与过期
// ============================================================================

/// 120 秒内再次请求验证码会被拒绝，并给出可重试时间
#[tokio::test]
async fn test_request_login_cool_down() {
    let h = harness();
    let alice = sign_up(&h, "alice").await;

    request_code(&h, &alice).await;
    let first = h.codes.last(&alice.email_address).await.unwrap().unwrap();

    let err = h
        .community
        .request_login(&alice.email_address)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    match err {
        Error::RequestLoginCoolDown { try_again_at } => {
            assert_eq!(try_again_at, first.issued_at + 120);
        }
        other => panic!("expected cool down, got {:?}", other),
    }

    assert_eq!(h.outbox.sent().len(), 1);
    assert_eq!(h.codes.len(), 1);
}

/// 冷却时间为零时可以连续请求，每次都产生一条新记录
#[tokio::test]
async fn test_request_login_without_cool_down() {
    let h = harness_with(default_config().with_request_login_cool_down(Duration::ZERO));
    let alice = sign_up(&h, "alice").await;

    request_code(&h, &alice).await;
    request_code(&h, &alice).await;

    assert_eq!(h.codes.codes_for(&alice.email_address).len(), 2);
    assert_eq!(h.outbox.sent().len(), 2);
}

/// 过期的验证码无论其他字段是否正确都会被拒绝
#[tokio::test]
async fn test_login_with_expired_code() {
    let h = harness_with(default_config().with_confirmation_code_ttl(Duration::ZERO));
    let alice = sign_up(&h, "alice").await;
    let code = request_code(&h, &alice).await;

    let err = h
        .community
        .login(&alice.email_address, &fresh_key(), &code)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Login(LoginError::ConfirmationCodeExpired)
    ));
    assert_eq!(err.kind(), ErrorKind::Expired);

    assert!(h.keys.is_empty());
    assert!(h.tokens.is_empty());
    assert!(!h.codes.last(&alice.email_address).await.unwrap().unwrap().used);
}

/// 验证码过期时，即使验证码和公钥都已被使用，也报告过期
#[tokio::test]
async fn test_expired_code_wins_over_used_code_and_key() {
    let h = harness_with(default_config().with_confirmation_code_ttl(Duration::ZERO));
    let alice = sign_up(&h, "alice").await;
    let code = request_code(&h, &alice).await;

    let issued = h.codes.last(&alice.email_address).await.unwrap().unwrap();
    assert!(h.codes.mark_used(&issued.id).await.unwrap());
    let used_key = fresh_key();
    assert!(h.keys.mark_used(&used_key).await.unwrap());

    let err = h
        .community
        .login(&alice.email_address, &used_key, &code)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Login(LoginError::ConfirmationCodeExpired)
    ));
    assert_eq!(h.keys.len(), 1);
    assert!(h.tokens.is_empty());
}

/// 极大的冷却时间不会溢出，可重试时间饱和到最大时间戳
#[tokio::test]
async fn test_huge_cool_down_saturates() {
    let h = harness_with(
        default_config().with_request_login_cool_down(Duration::from_secs(i64::MAX as u64)),
    );
    let alice = sign_up(&h, "alice").await;
    request_code(&h, &alice).await;

    for _ in 0..2 {
        let err = h
            .community
            .request_login(&alice.email_address)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RequestLoginCoolDown {
                try_again_at: i64::MAX
            }
        ));
    }
    assert_eq!(h.codes.len(), 1);
}

/// 极大的 Token 有效期不会回绕成已过期的 Token
#[tokio::test]
async fn test_huge_access_token_ttl_saturates() {
    let h = harness_with(default_config().with_access_token_ttl(Duration::from_secs(u64::MAX)));
    let alice = sign_up(&h, "alice").await;
    let code = request_code(&h, &alice).await;

    let token = h
        .community
        .login(&alice.email_address, &fresh_key(), &code)
        .await
        .unwrap();
    assert_eq!(token.expires_at, i64::MAX);
    assert!(token.expires_at > token.issued_at);
    assert!(!token.is_expired());

    let member = h
        .community
        .get_member_by_access_token(token.signed_token())
        .await
        .unwrap();
    assert_eq!(member.id, alice.id);
}

// ============================================================================
// 防重放
// ============================================================================

/// 已使用的验证码不能再次登录，重复失败不改变任何状态
#[tokio::test]
async fn test_login_with_used_code_is_idempotent_failure() {
    let h = harness();
    let alice = sign_up(&h, "alice").await;
    let code = request_code(&h, &alice).await;
    let first_key = fresh_key();

    h.community
        .login(&alice.email_address, &first_key, &code)
        .await
        .unwrap();
    let after_login = h.members.fetch_by_id(&alice.id).await.unwrap().unwrap();

    for _ in 0..3 {
        let err = h
            .community
            .login(&alice.email_address, &fresh_key(), &code)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Login(LoginError::ConfirmationCodeAlreadyUsed)
        ));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    assert_eq!(h.tokens.len(), 1);
    assert_eq!(h.keys.len(), 1);
    assert_eq!(
        h.members.fetch_by_id(&alice.id).await.unwrap().unwrap(),
        after_login
    );
}

/// 公钥在全系统范围内只能使用一次，与使用它的成员无关
#[tokio::test]
async fn test_public_key_is_single_use_across_members() {
    let h = harness();
    let alice = sign_up(&h, "alice").await;
    let bob = sign_up(&h, "bob").await;
    let key = fresh_key();

    let alice_code = request_code(&h, &alice).await;
    h.community
        .login(&alice.email_address, &key, &alice_code)
        .await
        .unwrap();

    let bob_code = request_code(&h, &bob).await;
    for _ in 0..2 {
        let err = h
            .community
            .login(&bob.email_address, &key, &bob_code)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Login(LoginError::PublicKeyAlreadyUsed)));
    }

    assert!(!h.codes.last(&bob.email_address).await.unwrap().unwrap().used);
    assert_eq!(h.tokens.records_for(&bob.id).len(), 0);

    h.community
        .login(&bob.email_address, &fresh_key(), &bob_code)
        .await
        .unwrap();
}

/// 验证码只对签发它的邮箱有效
#[tokio::test]
async fn test_code_is_bound_to_email() {
    let h = harness();
    let alice = sign_up(&h, "alice").await;
    let bob = sign_up(&h, "bob").await;
    let alice_code = request_code(&h, &alice).await;

    let err = h
        .community
        .login(&bob.email_address, &fresh_key(), &alice_code)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Login(LoginError::ConfirmationCodeNotFound)
    ));
}

/// 并发使用同一个验证码时只有一次登录成功
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_with_same_code() {
    let h = harness();
    let alice = sign_up(&h, "alice").await;
    let code = request_code(&h, &alice).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let community = h.community.clone();
            let email = alice.email_address.clone();
            let code = code.clone();
            tokio::spawn(async move { community.login(&email, &fresh_key(), &code).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert!(matches!(
                err,
                Error::Login(LoginError::ConfirmationCodeAlreadyUsed)
            )),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(h.tokens.len(), 1);
}

/// 多个成员并发提交同一个公钥时只有一次登录成功
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_with_same_public_key() {
    let h = harness();
    let key = fresh_key();

    let mut attempts = Vec::new();
    for i in 0..8 {
        let member = sign_up(&h, &format!("member{}", i)).await;
        let code = request_code(&h, &member).await;
        attempts.push((member, code));
    }

    let handles: Vec<_> = attempts
        .iter()
        .map(|(member, code)| {
            let community = h.community.clone();
            let email = member.email_address.clone();
            let code = code.clone();
            tokio::spawn(async move { community.login(&email, &key, &code).await })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(token) => winners.push(token.subject),
            Err(err) => assert!(matches!(
                err,
                Error::Login(LoginError::PublicKeyAlreadyUsed)
            )),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(h.tokens.len(), 1);
    assert_eq!(h.keys.len(), 1);

    for (member, _) in &attempts {
        let stored = h.members.fetch_by_id(&member.id).await.unwrap().unwrap();
        if member.id == winners[0] {
            assert_eq!(stored.public_key, Some(key));
        } else {
            assert_eq!(stored.public_key, None);
        }
    }
}

/// 再次登录会绑定新的公钥和 Token
#[tokio::test]
async fn test_second_login_rebinds_key_and_token() {
    let h = harness_with(default_config().with_request_login_cool_down(Duration::ZERO));
    let alice = sign_up(&h, "alice").await;

    let first_code = request_code(&h, &alice).await;
    let first = h
        .community
        .login(&alice.email_address, &fresh_key(), &first_code)
        .await
        .unwrap();

    let second_code = request_code(&h, &alice).await;
    let second_key = fresh_key();
    let second = h
        .community
        .login(&alice.email_address, &second_key, &second_code)
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    let member = h.community.get_member(&alice.id).await.unwrap();
    assert_eq!(member.public_key, Some(second_key));
    assert_eq!(member.access_token_id, Some(second.id));

    // 旧 Token 在过期前仍然有效
    assert_eq!(
        h.community
            .get_member_by_access_token(first.signed_token())
            .await
            .unwrap()
            .id,
        alice.id
    );
}

// ============================================================================
// Token 与观察者
// ============================================================================

/// 篡改或由其他密钥签名的 Token 会被拒绝
#[tokio::test]
async fn test_rejects_foreign_and_tampered_tokens() {
    let h = harness();
    let alice = sign_up(&h, "alice").await;
    let code = request_code(&h, &alice).await;
    let token = h
        .community
        .login(&alice.email_address, &fresh_key(), &code)
        .await
        .unwrap();

    let mut tampered = token.signed_token().to_string();
    tampered.push('x');
    let err = h
        .community
        .get_member_by_access_token(&tampered)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Token(_)));

    let other = harness_with(
        CommunityConfig::new()
            .with_signing_key(AccessTokenSigningKey::new(vec![9u8; 1024]).unwrap()),
    );
    let err = other
        .community
        .get_member_by_access_token(token.signed_token())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Token(TokenError::InvalidSignature)));
}

/// Token 有效但成员不存在
#[tokio::test]
async fn test_token_for_missing_member() {
    let h = harness();
    let alice = sign_up(&h, "alice").await;
    let code = request_code(&h, &alice).await;
    let token = h
        .community
        .login(&alice.email_address, &fresh_key(), &code)
        .await
        .unwrap();

    let empty = harness();
    let err = empty
        .community
        .get_member_by_access_token(token.signed_token())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Member(MemberError::NoMemberForAccessToken)));
}

/// 登录观察者按注册顺序收到更新后的成员
#[tokio::test]
async fn test_login_observers() {
    let h = harness();
    let calls = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second"] {
        let calls = calls.clone();
        h.community.on_login(move |member: &Member| {
            assert!(member.verified_email_address);
            calls.lock().unwrap().push((name, member.id));
        });
    }

    let alice = sign_up(&h, "alice").await;
    let code = request_code(&h, &alice).await;
    h.community
        .login(&alice.email_address, &fresh_key(), &code)
        .await
        .unwrap();

    assert_eq!(
        *calls.lock().unwrap(),
        vec![("first", alice.id), ("second", alice.id)]
    );

    let _ = h
        .community
        .login(&alice.email_address, &fresh_key(), &code)
        .await;
    assert_eq!(calls.lock().unwrap().len(), 2);
}

/// 用户名和邮箱的唯一性
#[tokio::test]
async fn test_sign_up_uniqueness() {
    let h = harness();
    sign_up(&h, "alice").await;

    let err = h
        .community
        .sign_up(
            Username::new("alice").unwrap(),
            email("new@x.com"),
            Metadata::new(ProperName::new("A", "B").unwrap()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = h
        .community
        .sign_up(
            Username::new("alice_2").unwrap(),
            email("ALICE@x.com"),
            Metadata::new(ProperName::new("A", "B").unwrap()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.members.len(), 1);
}
