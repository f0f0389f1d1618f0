//! 值对象模块
//!
//! 身份相关的基础数据都包装成不可变的值对象。构造函数是唯一的校验点：
//! 拿到一个值对象实例，就意味着它已经通过了校验。反序列化同样会走构造函数，
//! 因此存储层读回的数据也无法绕过校验。
//!
//! ## 示例
//!
//! ```rust
//! use community_auth::value_objects::{ConfirmationCode, EmailAddress, Username};
//!
//! let email = EmailAddress::new("Alice@Example.com").unwrap();
//! assert_eq!(email.as_str(), "alice@example.com");
//!
//! assert!(Username::new("alice_01").is_ok());
//! assert!(Username::new("Alice").is_err());
//!
//! assert!(ConfirmationCode::new("000000").is_err());
//! ```

mod base64_string;
mod confirmation_code;
mod email_address;
mod proper_name;
mod public_key;
mod signing_key;
mod username;

pub use base64_string::Base64String;
pub use confirmation_code::{CONFIRMATION_CODE_LENGTH, ConfirmationCode};
pub use email_address::EmailAddress;
pub use proper_name::ProperName;
pub use public_key::{MEMBER_ACCESS_PUBLIC_KEY_LENGTH, MemberAccessPublicKey};
pub use signing_key::{ACCESS_TOKEN_SIGNING_KEY_LENGTH, AccessTokenSigningKey};
pub use username::Username;
