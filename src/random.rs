//! 安全随机数生成模块
//!
//! 提供密码学安全的随机数生成功能，用于生成验证码等敏感数据。
//! 所有随机数据都直接取自操作系统的 CSPRNG (`OsRng`)。

use rand::{TryRngCore, rngs::OsRng};
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, Error, Result};

/// 小于该值的字节可以无偏地映射到 0-9（250 = 25 * 10）
const UNBIASED_DIGIT_BOUND: u8 = 250;

/// 生成指定长度的随机字节数组
///
/// 使用操作系统提供的密码学安全随机数生成器 (CSPRNG)
///
/// # Example
///
/// ```rust
/// use community_auth::random::generate_random_bytes;
///
/// let bytes = generate_random_bytes(32).unwrap();
/// assert_eq!(bytes.len(), 32);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))?;
    Ok(bytes)
}

/// 生成指定位数的数字字符串
///
/// 每一位都独立、均匀地取自 0-9：随机字节大于等于 250 时丢弃重抽，
/// 避免直接取模带来的偏差。结果与 locale 无关，只包含 ASCII 数字。
///
/// # Example
///
/// ```rust
/// use community_auth::random::generate_numeric_code;
///
/// let code = generate_numeric_code(6).unwrap();
/// assert_eq!(code.len(), 6);
/// assert!(code.bytes().all(|b| b.is_ascii_digit()));
/// ```
pub fn generate_numeric_code(length: usize) -> Result<String> {
    let mut code = String::with_capacity(length);
    let mut buffer = [0u8; 16];

    while code.len() < length {
        OsRng
            .try_fill_bytes(&mut buffer)
            .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))?;

        for byte in buffer {
            if code.len() == length {
                break;
            }
            if byte < UNBIASED_DIGIT_BOUND {
                code.push(char::from(b'0' + byte % 10));
            }
        }
    }

    Ok(code)
}

/// 常量时间比较两个字节切片
///
/// 用于防止时序攻击
///
/// ```rust
/// use community_auth::random::constant_time_compare;
///
/// assert!(constant_time_compare(b"123456", b"123456"));
/// assert!(!constant_time_compare(b"123456", b"654321"));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// 常量时间比较两个字符串
pub fn constant_time_compare_str(a: &str, b: &str) -> bool {
    constant_time_compare(a.as_bytes(), b.as_bytes())
}
