//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（Repository、令牌/密码/身份、事件通知）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - access: 诊所内的角色权限校验
//! - error: 应用层错误定义

pub mod access;
pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

pub use access::{AccessPolicy, Actor};
pub use error::ApplicationError;
