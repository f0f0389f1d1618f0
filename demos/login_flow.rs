//! 无密码登录与认证申请示例
//!
//! 展示如何通过 `Community` 门面完成注册、请求验证码、登录、
//! 解析 Access Token 以及提交并审核认证申请。
//!
//! 运行: cargo run --example login_flow

use std::sync::Arc;

use community_auth::prelude::*;
use community_auth::random::generate_random_bytes;

/// 组装内存存储版本的社区
fn build_community(outbox: Arc<OutboxTransport>) -> community_auth::Result<Community> {
    // 实际应用中密钥应通过 CommunityConfig::from_env() 从环境变量读取
    let signing_key = AccessTokenSigningKey::new(generate_random_bytes(1024)?)?;

    Community::new(
        Dependencies {
            members: Arc::new(InMemoryMemberStore::new()),
            applications: Arc::new(InMemoryApplicationStore::new()),
            confirmation_codes: Arc::new(InMemoryConfirmationCodeStore::new()),
            public_keys: Arc::new(InMemoryPublicKeyStore::new()),
            access_tokens: Arc::new(InMemoryAccessTokenStore::new()),
            transport: outbox,
        },
        CommunityConfig::new().with_signing_key(signing_key),
    )
}

async fn sign_up(community: &Community, username: &str) -> community_auth::Result<Member> {
    community
        .sign_up(
            Username::new(username)?,
            EmailAddress::new(&format!("{}@example.com", username))?,
            Metadata::new(ProperName::new("Demo", "Member")?),
        )
        .await
}

#[tokio::main]
async fn main() -> community_auth::Result<()> {
    println!("=== community-auth 登录示例 ===\n");

    let outbox = Arc::new(OutboxTransport::new());
    let community = build_community(outbox.clone())?;

    community.on_login(|member: &Member| {
        println!("   📣 登录通知: {}", member.username);
    });
    community.on_application_approved(|member: &Member| {
        println!("   📣 认证通知: {} 已通过社区认证", member.username);
    });

    // 1. 注册
    println!("📝 注册成员...");
    let alice = sign_up(&community, "alice").await?;
    let root = sign_up(&community, "root").await?;
    community.promote(&root.email_address).await?;
    println!("   alice 状态: {:?}", alice.status());
    println!("   root 已提升为管理员\n");

    // 2. 请求验证码
    println!("✉️  请求验证码...");
    community.request_login(&alice.email_address).await?;
    let Some(code) = outbox.last_sent_to(&alice.email_address) else {
        println!("   ❌ 没有收到验证码");
        return Ok(());
    };
    println!("   验证码已投递到 {}\n", alice.email_address);

    match community.request_login(&alice.email_address).await {
        Ok(()) => println!("   再次请求成功\n"),
        Err(e) => println!("   ⏳ 再次请求被拒绝: {}\n", e),
    }

    // 3. 登录
    println!("🔐 登录...");
    let key = MemberAccessPublicKey::new(&generate_random_bytes(32)?)?;
    let token = community.login(&alice.email_address, &key, &code).await?;
    println!("   Token ID: {}", token.id);
    println!("   过期时间: {}\n", token.expires_at);

    // 4. 重放同一个验证码
    println!("🔁 重放验证码...");
    match community.login(&alice.email_address, &key, &code).await {
        Ok(_) => println!("   登录成功\n"),
        Err(e) => println!("   ❌ {}\n", e),
    }

    // 5. 解析 Token
    println!("🔍 解析 Access Token...");
    let member = community
        .get_member_by_access_token(token.signed_token())
        .await?;
    println!("   成员: {} ({:?})\n", member.username, member.status());

    // 6. 认证申请
    println!("🗂  提交认证申请...");
    let application = community
        .apply_for_verification(&alice.id, "I organise the local meetup")
        .await?;
    println!("   申请状态: {}", application.state);

    community
        .approve_application(&application.id, &root.id)
        .await?;
    let member = community.get_member(&alice.id).await?;
    println!("   审核后状态: {:?}\n", member.status());

    Ok(())
}
