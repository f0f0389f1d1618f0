use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::random::generate_numeric_code;

/// 验证码位数
pub const CONFIRMATION_CODE_LENGTH: usize = 6;

/// 保留值，永远不是合法验证码
const RESERVED_CODE: &str = "000000";

/// 6 位数字验证码
///
/// `"000000"` 被视为无效。
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfirmationCode(String);

impl ConfirmationCode {
    /// 校验并创建验证码
    pub fn new(code: &str) -> std::result::Result<Self, ValidationError> {
        if code.len() != CONFIRMATION_CODE_LENGTH {
            return Err(ValidationError::InvalidConfirmationCode(format!(
                "expected {} digits, got length {}",
                CONFIRMATION_CODE_LENGTH,
                code.len()
            )));
        }

        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidConfirmationCode(
                "not a numeric string".to_string(),
            ));
        }

        if code == RESERVED_CODE {
            return Err(ValidationError::InvalidConfirmationCode(
                "zero confirmation code".to_string(),
            ));
        }

        Ok(Self(code.to_string()))
    }

    /// 使用 CSPRNG 生成新的验证码
    ///
    /// 每一位独立均匀分布；抽到保留值时重新生成。
    pub fn generate() -> Result<Self> {
        loop {
            let code = generate_numeric_code(CONFIRMATION_CODE_LENGTH)?;
            if code != RESERVED_CODE {
                return Ok(Self::new(&code)?);
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// 验证码属于凭证，调试输出中不展示
impl fmt::Debug for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConfirmationCode(******)")
    }
}

impl TryFrom<String> for ConfirmationCode {
    type Error = ValidationError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ConfirmationCode> for String {
    fn from(value: ConfirmationCode) -> Self {
        value.0
    }
}
