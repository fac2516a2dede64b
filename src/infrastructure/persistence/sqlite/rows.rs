//! 行映射公共函数
//!
//! UUID 存为 TEXT，时间戳为固定微秒精度的 RFC 3339（UTC），
//! 保证字符串比较与时间先后一致

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use std::str::FromStr;
use uuid::Uuid;

use crate::application::ports::RepositoryError;

pub(crate) fn db_error(e: sqlx::Error) -> RepositoryError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => RepositoryError::Duplicate(db.message().to_string()),
        _ => RepositoryError::DatabaseError(e.to_string()),
    }
}

fn serialization(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::SerializationError(e.to_string())
}

pub(crate) fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(raw).map_err(serialization)
}

pub(crate) fn parse_opt_uuid(raw: Option<String>) -> Result<Option<Uuid>, RepositoryError> {
    raw.as_deref().map(parse_uuid).transpose()
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serialization)
}

pub(crate) fn parse_opt_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    raw.as_deref().map(parse_ts).transpose()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(serialization)
}

pub(crate) fn parse_opt_date(raw: Option<String>) -> Result<Option<NaiveDate>, RepositoryError> {
    raw.as_deref().map(parse_date).transpose()
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, RepositoryError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(serialization)
}

/// 解析枚举列（string_enum! 生成的 FromStr）
pub(crate) fn parse_enum<T>(raw: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(serialization)
}

pub(crate) fn to_u32(field: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::SerializationError(format!("{} out of range: {}", field, value)))
}

pub(crate) fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// LIKE 模式（小写，转义 % 和 _）
pub(crate) fn like_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let a = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1);
        assert!(ts(a) < ts(b));
        assert_eq!(ts(a), "2030-01-01T09:00:00.000000Z");
        assert_eq!(parse_ts(&ts(b)).unwrap(), b);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Rex "), "%rex%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
