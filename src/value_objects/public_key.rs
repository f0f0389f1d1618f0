use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Error, Result, ValidationError};

/// 公钥长度（字节）
pub const MEMBER_ACCESS_PUBLIC_KEY_LENGTH: usize = 32;

const KEY_NAME: &str = "member access public key";

/// 成员登录时提交的 Ed25519 公钥
///
/// 在整个系统生命周期内只能成功使用一次。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberAccessPublicKey([u8; MEMBER_ACCESS_PUBLIC_KEY_LENGTH]);

impl MemberAccessPublicKey {
    pub fn new(bytes: &[u8]) -> std::result::Result<Self, ValidationError> {
        let key: [u8; MEMBER_ACCESS_PUBLIC_KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| ValidationError::InvalidKeyLength {
                    key: KEY_NAME,
                    expected: MEMBER_ACCESS_PUBLIC_KEY_LENGTH,
                    actual: bytes.len(),
                })?;

        if key.iter().all(|b| *b == 0) {
            return Err(ValidationError::ZeroKey(KEY_NAME));
        }

        Ok(Self(key))
    }

    pub fn from_base64(encoded: &str) -> std::result::Result<Self, ValidationError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| ValidationError::InvalidBase64(e.to_string()))?;
        Self::new(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MEMBER_ACCESS_PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// 解释为 Ed25519 验签公钥
    ///
    /// 32 字节并不一定是曲线上的合法点，因此这里可能失败。
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0)
            .map_err(|e| Error::Crypto(CryptoError::InvalidKey(e.to_string())))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Display for MemberAccessPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for MemberAccessPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberAccessPublicKey({})", self.to_base64())
    }
}

impl TryFrom<String> for MemberAccessPublicKey {
    type Error = ValidationError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_base64(&value)
    }
}

impl From<MemberAccessPublicKey> for String {
    fn from(value: MemberAccessPublicKey) -> Self {
        value.to_base64()
    }
}
