//! In-Memory Rate Limiter - 固定窗口限流
//!
//! 每个 (作用域, 客户端) 一个计数窗口，窗口过期后重新计数

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// 限流作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateScope {
    /// 普通 API
    Api,
    /// 登录注册等认证接口
    Auth,
}

/// 限流配置
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window: Duration,
    pub max_requests: u32,
    pub auth_max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::from_secs(60),
            max_requests: 300,
            auth_max_requests: 20,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// 固定窗口限流器
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    windows: DashMap<(RateScope, String), Window>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn limit_for(&self, scope: RateScope) -> u32 {
        match scope {
            RateScope::Api => self.config.max_requests,
            RateScope::Auth => self.config.auth_max_requests,
        }
    }

    /// 记录一次请求
    ///
    /// 超出限制时返回 `Err(retry_after_secs)`
    pub fn check(&self, scope: RateScope, key: &str) -> Result<(), u64> {
        if !self.config.enabled {
            return Ok(());
        }
        self.check_at(scope, key, Instant::now())
    }

    fn check_at(&self, scope: RateScope, key: &str, now: Instant) -> Result<(), u64> {
        let limit = self.limit_for(scope);
        let mut entry = self
            .windows
            .entry((scope, key.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.config.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= limit {
            let remaining = self
                .config
                .window
                .saturating_sub(now.saturating_duration_since(entry.started));
            return Err(remaining.as_secs().max(1));
        }

        entry.count += 1;
        Ok(())
    }

    /// 清理已过期的窗口，返回清理数量
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let window = self.config.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
        before - self.windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
