//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod appointment_handlers;
mod auth_handlers;
mod clinic_handlers;
mod dashboard_handlers;
mod invoice_handlers;
mod medical_record_handlers;
mod patient_handlers;
mod product_handlers;

pub use appointment_handlers::*;
pub use auth_handlers::*;
pub use clinic_handlers::*;
pub use dashboard_handlers::*;
pub use invoice_handlers::*;
pub use medical_record_handlers::*;
pub use patient_handlers::*;
pub use product_handlers::*;
