//! 通用输入校验
//!
//! 文本字段统一做 trim，空白字符串视为未提供

use serde::{Deserialize, Serialize};

use super::DomainError;

/// 邮箱地址（已规范化为小写）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let email = raw.trim().to_lowercase();

        let well_formed = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };

        if !well_formed || email.len() > 254 || email.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid("email", "must be a valid email address"));
        }

        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 必填文本字段
pub fn required_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid(field, "cannot be empty"));
    }
    if trimmed.chars().count() > max_len {
        return Err(DomainError::invalid(
            field,
            format!("cannot exceed {} characters", max_len),
        ));
    }
    Ok(trimmed.to_string())
}

/// 可选文本字段
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, DomainError> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => required_text(field, v, max_len).map(Some),
    }
}

/// 可选邮箱字段
pub fn optional_email(value: Option<&str>) -> Result<Option<Email>, DomainError> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => Email::parse(v).map(Some),
    }
}

/// 密码强度
///
/// bcrypt 只使用前 72 字节，超出部分直接拒绝
pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < 8 {
        return Err(DomainError::invalid(
            "password",
            "must be at least 8 characters long",
        ));
    }
    if password.len() > 72 {
        return Err(DomainError::invalid("password", "cannot exceed 72 bytes"));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(DomainError::invalid(
            "password",
            "must contain at least one letter and one digit",
        ));
    }
    Ok(())
}

/// 正数校验（体重、体温等测量值）
pub fn positive_measure(field: &'static str, value: Option<f64>) -> Result<Option<f64>, DomainError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => {
            Err(DomainError::invalid(field, "must be a positive number"))
        }
        other => Ok(other),
    }
}
