//! 统一错误类型模块
//!
//! 提供 community-auth 中所有操作的错误类型定义。
//!
//! 每个错误都可以通过 [`Error::kind`] 归类为一种 [`ErrorKind`]，
//! 适配层（HTTP、CLI 等）据此映射状态码，而不必匹配具体变体。

use thiserror::Error;

/// community-auth 的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// community-auth 的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 输入校验错误
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Access Token 相关错误
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// 配置错误
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 存储错误（由存储实现返回，原样透传）
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 加密错误
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// 验证码投递失败
    #[error("transport error: {0}")]
    Transport(String),

    /// 登录流程错误
    #[error("login error: {0}")]
    Login(#[from] LoginError),

    /// 成员相关错误
    #[error("member error: {0}")]
    Member(#[from] MemberError),

    /// 认证申请相关错误
    #[error("application error: {0}")]
    Application(#[from] ApplicationError),

    /// 请求者没有管理员权限
    #[error("insufficient permissions")]
    InsufficientPermissions,

    /// 登录请求处于冷却期
    #[error("please retry to request the login at: {try_again_at}")]
    RequestLoginCoolDown {
        /// 允许重试的 Unix 时间戳（秒）
        try_again_at: i64,
    },

    /// 持久化数据不一致（例如未知的申请状态）
    #[error("integrity error: {0}")]
    Integrity(String),
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 输入格式错误
    Validation,
    /// 冲突：已被占用、已被使用、已审核等
    Conflict,
    /// 记录不存在
    NotFound,
    /// 权限不足
    Authorization,
    /// 凭证已过期
    Expired,
    /// 冷却期内重复请求
    RateLimited,
    /// 数据完整性错误
    Integrity,
    /// 外部协作方（存储、投递、签名）失败
    Collaborator,
}

impl Error {
    /// 创建一个存储操作错误
    ///
    /// 供外部存储实现（数据库、缓存等）包装底层驱动错误。
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(StorageError::OperationFailed(msg.into()))
    }

    /// 创建一个投递错误
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// 创建一个数据完整性错误
    pub fn integrity(msg: impl Into<String>) -> Self {
        Error::Integrity(msg.into())
    }

    /// 将错误归类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Token(TokenError::Expired) => ErrorKind::Expired,
            Error::Token(TokenError::EncodingFailed(_)) => ErrorKind::Collaborator,
            Error::Token(_) => ErrorKind::Validation,
            Error::Config(_) | Error::Crypto(_) | Error::Transport(_) => ErrorKind::Collaborator,
            Error::Storage(StorageError::NotFound(_)) => ErrorKind::NotFound,
            Error::Storage(_) => ErrorKind::Collaborator,
            Error::Login(LoginError::ConfirmationCodeNotFound) => ErrorKind::NotFound,
            Error::Login(LoginError::ConfirmationCodeExpired) => ErrorKind::Expired,
            Error::Login(_) => ErrorKind::Conflict,
            Error::Member(MemberError::NotFound(_) | MemberError::NoMemberForAccessToken) => {
                ErrorKind::NotFound
            }
            Error::Member(_) => ErrorKind::Conflict,
            Error::Application(ApplicationError::NotFound(_)) => ErrorKind::NotFound,
            Error::Application(_) => ErrorKind::Conflict,
            Error::InsufficientPermissions => ErrorKind::Authorization,
            Error::RequestLoginCoolDown { .. } => ErrorKind::RateLimited,
            Error::Integrity(_) => ErrorKind::Integrity,
        }
    }
}

/// 输入校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 无效的邮箱格式
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// 无效的用户名格式
    #[error("username \"{0}\" is invalid")]
    InvalidUsername(String),

    /// 字段为空
    #[error("{0} must be a non empty string")]
    EmptyField(String),

    /// 无效的验证码
    #[error("invalid confirmation code: {0}")]
    InvalidConfirmationCode(String),

    /// 长度不符的密钥
    #[error("invalid {key}: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        key: &'static str,
        expected: usize,
        actual: usize,
    },

    /// 全零密钥
    #[error("invalid {0}: all bytes are zero")]
    ZeroKey(&'static str),

    /// 无效的 base64 数据
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    /// 无效的标识符
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Access Token 相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token 已过期
    #[error("token has expired")]
    Expired,

    /// Token 格式无效
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// Token 签名无效
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token 编码失败
    #[error("token encoding failed: {0}")]
    EncodingFailed(String),

    /// Token 解码失败
    #[error("token decoding failed: {0}")]
    DecodingFailed(String),

    /// 缺少必需的 claim
    #[error("missing required claim: {0}")]
    MissingClaim(String),

    /// 无效的 claim 值
    #[error("invalid claim value: {0}")]
    InvalidClaim(String),
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 缺少必需的配置
    #[error("missing required configuration: {0}")]
    MissingRequired(String),

    /// 无效的配置值
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// 存储相关错误
///
/// 内存实现只会返回 `NotFound`；外部存储实现用 `OperationFailed`
/// （或 [`Error::storage`]）透传底层错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// 记录未找到
    #[error("not found: {0}")]
    NotFound(String),

    /// 操作失败
    #[error("storage operation failed: {0}")]
    OperationFailed(String),
}

/// 加密相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// 随机数生成失败
    #[error("random number generation failed: {0}")]
    RngFailed(String),

    /// 密钥无效
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// 登录流程错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("confirmation code doesn't exist")]
    ConfirmationCodeNotFound,

    #[error("confirmation code expired")]
    ConfirmationCodeExpired,

    #[error("confirmation code already used")]
    ConfirmationCodeAlreadyUsed,

    #[error("member access public key has already been used")]
    PublicKeyAlreadyUsed,

    /// 验证码绑定的成员与邮箱对应的成员不一致
    #[error("member mismatch - please try again")]
    ConfirmationCodeMemberMismatch,
}

/// 成员相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberError {
    #[error("member not found: {0}")]
    NotFound(String),

    #[error("username taken: {0}")]
    UsernameTaken(String),

    #[error("email address taken: {0}")]
    EmailAddressTaken(String),

    #[error("couldn't get member from access token")]
    NoMemberForAccessToken,
}

/// 认证申请相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplicationError {
    #[error("application not found: {0}")]
    NotFound(String),

    #[error("a pending application already exists")]
    PendingApplicationExists,

    #[error("member is already verified")]
    AlreadyVerified,

    #[error("application has already been reviewed")]
    AlreadyReviewed,
}
