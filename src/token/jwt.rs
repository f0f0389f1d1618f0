//! HS512 JWT 编解码
//!
//! Access Token 的线上格式是标准 JWT，只使用 HS512 一种算法，签名密钥为
//! 1024 字节的 [`AccessTokenSigningKey`]。
//!
//! Claims 只包含四个字段：
//!
//! | claim | 含义 |
//! |---|---|
//! | `sub` | 成员 ID |
//! | `jti` | Token ID（每次签发唯一） |
//! | `iat` | 签发时间（Unix 时间戳） |
//! | `exp` | 过期时间（Unix 时间戳） |

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, TokenError};
use crate::value_objects::AccessTokenSigningKey;

/// Access Token 的 JWT Claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// 主题（成员 ID）
    pub sub: String,
    /// Token ID
    pub jti: String,
    /// 签发时间（Unix 时间戳）
    pub iat: i64,
    /// 过期时间（Unix 时间戳）
    pub exp: i64,
}

/// HS512 编解码器
pub(crate) struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    pub(crate) fn new(key: &AccessTokenSigningKey) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(key.as_bytes()),
            decoding_key: DecodingKey::from_secret(key.as_bytes()),
            validation,
        }
    }

    /// 签名
    pub(crate) fn encode(&self, claims: &AccessTokenClaims) -> Result<String> {
        let header = Header::new(Algorithm::HS512);

        encode(&header, claims, &self.encoding_key).map_err(|e| {
            Error::Token(TokenError::EncodingFailed(format!(
                "failed to encode JWT: {}",
                e
            )))
        })
    }

    /// 校验签名和过期时间并解码
    pub(crate) fn decode(&self, token: &str) -> Result<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let error = match e.kind() {
                    JwtErrorKind::ExpiredSignature => TokenError::Expired,
                    JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
                        TokenError::InvalidSignature
                    }
                    JwtErrorKind::InvalidToken
                    | JwtErrorKind::Base64(_)
                    | JwtErrorKind::Utf8(_) => {
                        TokenError::InvalidFormat("invalid token structure".to_string())
                    }
                    JwtErrorKind::MissingRequiredClaim(claim) => {
                        TokenError::MissingClaim(claim.clone())
                    }
                    JwtErrorKind::Json(err) => TokenError::InvalidClaim(err.to_string()),
                    _ => TokenError::DecodingFailed(e.to_string()),
                };
                Error::Token(error)
            })?;

        Ok(token_data.claims)
    }
}
