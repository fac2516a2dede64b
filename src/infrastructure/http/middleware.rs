//! HTTP Middleware
//!
//! - 状态码错误日志
//! - 按客户端地址的固定窗口限流

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use crate::infrastructure::memory::{InMemoryRateLimiter, RateScope};

/// HTTP 状态码错误日志中间件
///
/// 拦截 HTTP 响应，当状态码为 4xx 或 5xx 时记录日志
/// 注意：业务错误的详情在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP client error"
        );
    }

    response
}

/// 客户端标识：X-Forwarded-For 第一个地址 > 对端地址 > anonymous
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}

fn scope_for(path: &str) -> RateScope {
    if path.starts_with("/api/auth/") {
        RateScope::Auth
    } else {
        RateScope::Api
    }
}

/// 限流中间件
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<InMemoryRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);
    let scope = scope_for(request.uri().path());

    match limiter.check(scope, &key) {
        Ok(()) => next.run(request).await,
        Err(retry_after_secs) => {
            tracing::debug!(client = %key, ?scope, "Request rejected by rate limiter");
            ApiError::TooManyRequests { retry_after_secs }.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderValue, Request as HttpRequest, StatusCode},
        routing::{get, post},
        Router,
    };
    use std::time::Duration;
    use tower::util::ServiceExt;

    use crate::infrastructure::memory::RateLimitConfig;

    async fn ok_handler() -> &'static str {
        "OK"
    }

    async fn not_found_handler() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    async fn error_handler() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn create_test_router() -> Router {
        Router::new()
            .route("/ok", get(ok_handler))
            .route("/not-found", get(not_found_handler))
            .route("/error", get(error_handler))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    fn limited_router(max: u32, auth_max: u32) -> Router {
        let limiter = Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
            enabled: true,
            window: Duration::from_secs(60),
            max_requests: max,
            auth_max_requests: auth_max,
        }));
        Router::new()
            .route("/api/ping", get(ok_handler))
            .route("/api/auth/login", post(ok_handler))
            .layer(axum::middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ))
    }

    fn request(method: &str, uri: &str, client: &'static str) -> HttpRequest<Body> {
        let mut request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        request
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static(client));
        request
    }

    #[tokio::test]
    async fn test_ok_response_no_log() {
        let app = create_test_router();
        let request = HttpRequest::builder()
            .uri("/ok")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_client_error_logs_warning() {
        let app = create_test_router();
        let request = HttpRequest::builder()
            .uri("/not-found")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_server_error_logs_error() {
        let app = create_test_router();
        let request = HttpRequest::builder()
            .uri("/error")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_rate_limit_per_client() {
        let app = limited_router(2, 10);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(request("GET", "/api/ping", "10.0.0.1"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(request("GET", "/api/ping", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));

        // 其他客户端不受影响
        let response = app
            .oneshot(request("GET", "/api/ping", "10.0.0.2, 172.16.0.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auth_routes_use_stricter_limit() {
        let app = limited_router(10, 1);

        let response = app
            .clone()
            .oneshot(request("POST", "/api/auth/login", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("POST", "/api/auth/login", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app
            .oneshot(request("GET", "/api/ping", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_client_key_fallbacks() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "192.168.1.5:5555".parse().unwrap();
        assert_eq!(client_key(&headers, Some(peer)), "192.168.1.5");
        assert_eq!(client_key(&headers, None), "anonymous");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.7");
    }
}
