use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ValidationError;

/// 签名密钥长度（字节）
pub const ACCESS_TOKEN_SIGNING_KEY_LENGTH: usize = 1024;

const KEY_NAME: &str = "access token signing key";

/// Access Token 的对称签名密钥
///
/// 必须恰好 1024 字节且不能全为零。密钥在 drop 时清零，`Debug` 输出不含密钥内容。
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessTokenSigningKey(Vec<u8>);

impl AccessTokenSigningKey {
    pub fn new(key: Vec<u8>) -> Result<Self, ValidationError> {
        if key.len() != ACCESS_TOKEN_SIGNING_KEY_LENGTH {
            return Err(ValidationError::InvalidKeyLength {
                key: KEY_NAME,
                expected: ACCESS_TOKEN_SIGNING_KEY_LENGTH,
                actual: key.len(),
            });
        }

        if key.iter().all(|b| *b == 0) {
            return Err(ValidationError::ZeroKey(KEY_NAME));
        }

        Ok(Self(key))
    }

    /// 从标准 base64 编码的字符串创建密钥
    pub fn from_base64(encoded: &str) -> Result<Self, ValidationError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ValidationError::InvalidBase64(e.to_string()))?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AccessTokenSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenSigningKey")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}
