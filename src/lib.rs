//! VetClinic - 多诊所宠物医院管理后端
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - access: 诊所角色与权限
//! - patient / scheduling / billing / inventory: 各业务上下文的值对象与规则
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Repositories, TokenService, PasswordHasher, IdentityProvider, Notifier）
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//! - Access: 诊所内的权限校验
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Persistence: SQLite 存储
//! - Adapters: JWT, bcrypt, Google 身份校验
//! - Memory: 限流器
//! - Events: 诊所房间事件发布
//! - Worker: MaintenanceWorker 周期清理

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_support;

pub use config::{load_config, AppConfig};
