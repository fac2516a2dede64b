//! 领域错误

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("{0}")]
    RuleViolation(String),
}

impl DomainError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn rule(message: impl Into<String>) -> Self {
        Self::RuleViolation(message.into())
    }
}
