//! SQLite Persistence - SQLite 数据库持久化实现

mod appointment_repo;
mod clinic_repo;
mod dashboard_repo;
mod database;
mod invoice_repo;
mod medical_record_repo;
mod patient_repo;
mod product_repo;
mod rows;
mod user_repo;

#[cfg(test)]
mod testing;

pub use appointment_repo::SqliteAppointmentRepository;
pub use clinic_repo::{SqliteClinicAccessRepository, SqliteClinicRepository};
pub use dashboard_repo::SqliteDashboardRepository;
pub use database::*;
pub use invoice_repo::SqliteInvoiceRepository;
pub use medical_record_repo::SqliteMedicalRecordRepository;
pub use patient_repo::SqlitePatientRepository;
pub use product_repo::SqliteProductRepository;
pub use user_repo::{SqliteRefreshTokenRepository, SqliteUserRepository};
