//! Auth Ports - 令牌、密码哈希与第三方身份
//!
//! 具体实现在 infrastructure/adapters/auth

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// 认证相关错误
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    Expired,

    #[error("Unexpected token type")]
    WrongTokenType,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Identity provider unreachable: {0}")]
    ProviderUnavailable(String),

    #[error("Identity rejected: {0}")]
    ProviderRejected(String),

    #[error("Identity provider is not configured")]
    ProviderDisabled,
}

/// 令牌类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// 已校验的令牌声明
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub email: String,
    pub token_id: Uuid,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

/// 新签发的令牌
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Token Service Port
pub trait TokenServicePort: Send + Sync {
    /// 签发访问令牌
    fn issue_access(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, AuthError>;

    /// 签发刷新令牌
    fn issue_refresh(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, AuthError>;

    /// 校验访问令牌
    fn verify_access(&self, token: &str) -> Result<TokenClaims, AuthError>;

    /// 校验刷新令牌
    fn verify_refresh(&self, token: &str) -> Result<TokenClaims, AuthError>;
}

/// Password Hasher Port
#[async_trait]
pub trait PasswordHasherPort: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String, AuthError>;

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// 第三方身份（Google）
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// Identity Provider Port
#[async_trait]
pub trait IdentityProviderPort: Send + Sync {
    /// 校验 ID Token 并返回身份信息
    async fn verify_id_token(&self, id_token: &str) -> Result<ExternalIdentity, AuthError>;
}
