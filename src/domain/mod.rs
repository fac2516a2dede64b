//! Domain Layer - 领域层
//!
//! 限界上下文:
//! - access: 诊所角色与权限
//! - patient: 患宠档案
//! - scheduling: 预约时间段与冲突检测
//! - billing: 发票金额与付款对账
//! - inventory: 库存与低库存判定

mod errors;
mod macros;

pub mod access;
pub mod billing;
pub mod inventory;
pub mod patient;
pub mod scheduling;
pub mod validation;

pub use access::{ClinicRole, Permission};
pub use errors::DomainError;
pub use validation::Email;
