//! Access Token 模块
//!
//! 登录成功后签发的 Bearer 凭证：HS512 签名的 JWT，默认 20 天有效。
//!
//! Token 是无状态的：有效性只取决于签名和过期时间。每次签发都会通过
//! [`AccessTokenStore`] 写一条审计记录，但解析时不会查询它，也没有吊销机制。
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use community_auth::token::{AccessTokenService, InMemoryAccessTokenStore};
//! use community_auth::value_objects::AccessTokenSigningKey;
//!
//! let key = AccessTokenSigningKey::new(vec![7u8; 1024]).unwrap();
//! let service = AccessTokenService::new(
//!     &key,
//!     Duration::from_secs(20 * 24 * 3600),
//!     Arc::new(InMemoryAccessTokenStore::new()),
//! );
//! assert!(service.parse("not-a-token").is_err());
//! ```

mod access;
pub mod jwt;

pub use access::{
    AccessTokenRecord, AccessTokenService, AccessTokenStore, InMemoryAccessTokenStore,
    MemberAccessToken,
};
pub use jwt::AccessTokenClaims;
