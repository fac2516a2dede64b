//! Worker Layer - Background Task Processing
//!
//! 实现 MaintenanceWorker，定期清理令牌、限流窗口与事件房间

mod maintenance_worker;

pub use maintenance_worker::{MaintenanceReport, MaintenanceWorker, MaintenanceWorkerConfig};
