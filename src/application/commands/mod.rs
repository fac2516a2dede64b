//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod appointment_commands;
mod auth_commands;
mod clinic_commands;
mod invoice_commands;
mod medical_record_commands;
mod patient_commands;
mod product_commands;

pub mod handlers;

pub use appointment_commands::*;
pub use auth_commands::*;
pub use clinic_commands::*;
pub use invoice_commands::*;
pub use medical_record_commands::*;
pub use patient_commands::*;
pub use product_commands::*;
