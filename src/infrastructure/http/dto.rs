//! Data Transfer Objects - 通用响应与分页

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::application::ports::Page;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

// ============================================================================
// 分页
// ============================================================================

/// 分页响应
#[derive(Debug, Serialize)]
pub struct PageResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T: Serialize> PageResponse<T> {
    /// 把仓储分页结果转换为响应 DTO
    pub fn from_page<R>(page: Page<R>) -> Self
    where
        T: From<R>,
    {
        let total_pages = page.total_pages();
        let page = page.map(T::from);
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages,
        }
    }
}

/// 时间戳统一输出为 RFC 3339（毫秒，UTC）
pub fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::PageRequest;
    use chrono::TimeZone;

    #[test]
    fn test_page_response_carries_total_pages() {
        let page = Page::new(vec![1u32, 2, 3], 45, PageRequest::new(Some(2), Some(20)));
        let response: PageResponse<u64> = PageResponse::from_page(page);
        assert_eq!(response.items, vec![1, 2, 3]);
        assert_eq!(response.page, 2);
        assert_eq!(response.total_pages, 3);
    }

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(json["errno"], 0);
        assert_eq!(json["error"], "");
        assert!(json["data"].is_object());
    }

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(timestamp(at), "2024-03-01T09:30:00.000Z");
    }
}
