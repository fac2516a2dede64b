//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod appointment_queries;
mod auth_queries;
mod clinic_queries;
mod dashboard_queries;
mod invoice_queries;
mod medical_record_queries;
mod patient_queries;
mod product_queries;

pub mod handlers;

pub use appointment_queries::*;
pub use auth_queries::*;
pub use clinic_queries::*;
pub use dashboard_queries::*;
pub use invoice_queries::*;
pub use medical_record_queries::*;
pub use patient_queries::*;
pub use product_queries::*;
