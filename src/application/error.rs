//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;
use uuid::Uuid;

use crate::application::ports::{AuthError, RepositoryError};
use crate::domain::DomainError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: Uuid,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 业务规则违反
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 资源冲突（重复、排班冲突）
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 未认证
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 无权限
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource_type, id }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建业务规则违反错误
    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(msg) => Self::Conflict(msg),
            other => Self::RepositoryError(other.to_string()),
        }
    }
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidField { .. } => Self::ValidationError(err.to_string()),
            DomainError::InvalidTransition { .. } => Self::InvalidState(err.to_string()),
            DomainError::RuleViolation(msg) => Self::BusinessRuleViolation(msg),
        }
    }
}

impl From<AuthError> for ApplicationError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken
            | AuthError::Expired
            | AuthError::WrongTokenType
            | AuthError::ProviderRejected(_) => Self::Unauthorized(err.to_string()),
            AuthError::ProviderDisabled => Self::BusinessRuleViolation(err.to_string()),
            AuthError::ProviderUnavailable(msg) => Self::ExternalServiceError(msg),
            AuthError::Hashing(msg) => Self::InternalError(msg),
        }
    }
}
