use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 标准 base64 数据（例如头像图片）
///
/// 内部保存解码后的字节，需要时再编码回 base64，往返无损。
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Base64String(Vec<u8>);

impl Base64String {
    pub fn new(encoded: &str) -> Result<Self, ValidationError> {
        STANDARD
            .decode(encoded)
            .map(Self)
            .map_err(|e| ValidationError::InvalidBase64(e.to_string()))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Base64String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD.encode(&self.0))
    }
}

impl fmt::Debug for Base64String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Base64String({} bytes)", self.0.len())
    }
}

impl TryFrom<String> for Base64String {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Base64String> for String {
    fn from(value: Base64String) -> Self {
        value.to_string()
    }
}
