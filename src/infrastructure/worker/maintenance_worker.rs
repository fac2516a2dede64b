//! Maintenance Worker - 周期性清理
//!
//! 每个周期：
//! 1. 删除过期或已吊销的 refresh token
//! 2. 清理过期的限流窗口
//! 3. 删除没有订阅者的事件房间

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::application::ports::RefreshTokenRepositoryPort;
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::memory::InMemoryRateLimiter;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct MaintenanceWorkerConfig {
    pub interval: Duration,
}

impl Default for MaintenanceWorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
        }
    }
}

/// 单个周期的清理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub tokens_purged: u64,
    pub rate_windows_pruned: usize,
    pub rooms_pruned: usize,
}

/// 维护 Worker
pub struct MaintenanceWorker {
    config: MaintenanceWorkerConfig,
    refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
    rate_limiter: Arc<InMemoryRateLimiter>,
    event_publisher: Arc<EventPublisher>,
}

impl MaintenanceWorker {
    pub fn new(
        config: MaintenanceWorkerConfig,
        refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
        rate_limiter: Arc<InMemoryRateLimiter>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            refresh_repo,
            rate_limiter,
            event_publisher,
        }
    }

    /// 启动 Worker，收到关闭信号后退出
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "MaintenanceWorker started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        // 第一次 tick 立即返回，跳过
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("MaintenanceWorker stopped");
    }

    /// 执行一次清理；单项失败不影响其他项
    pub async fn run_once(&self) -> MaintenanceReport {
        let tokens_purged = match self.refresh_repo.purge(Utc::now()).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "Failed to purge refresh tokens");
                0
            }
        };

        let report = MaintenanceReport {
            tokens_purged,
            rate_windows_pruned: self.rate_limiter.prune(),
            rooms_pruned: self.event_publisher.prune_empty_rooms(),
        };

        tracing::info!(
            tokens_purged = report.tokens_purged,
            rate_windows_pruned = report.rate_windows_pruned,
            rooms_pruned = report.rooms_pruned,
            "Maintenance cycle completed"
        );

        report
    }
}
