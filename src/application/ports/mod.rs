//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod appointment_repository;
mod auth;
mod clinic_repository;
mod dashboard_repository;
mod invoice_repository;
mod medical_record_repository;
mod notifier;
mod patient_repository;
mod product_repository;
mod repositories;
mod user_repository;

pub use appointment_repository::{AppointmentFilter, AppointmentRecord, AppointmentRepositoryPort};
pub use auth::{
    AuthError, ExternalIdentity, IdentityProviderPort, IssuedToken, PasswordHasherPort,
    TokenClaims, TokenKind, TokenServicePort,
};
pub use clinic_repository::{
    ClinicAccessRecord, ClinicAccessRepositoryPort, ClinicMember, ClinicMembership, ClinicRecord,
    ClinicRepositoryPort,
};
pub use dashboard_repository::{DashboardRepositoryPort, RecentMedicalRecord};
pub use invoice_repository::{InvoiceFilter, InvoiceRecord, InvoiceRepositoryPort, PaymentRecord};
pub use medical_record_repository::{
    MedicalRecordEntry, MedicalRecordFilter, MedicalRecordRepositoryPort,
};
pub use notifier::{
    AppointmentNotice, ClinicEvent, ClinicNotifierPort, InvoiceNotice, LowStockNotice,
    MedicalRecordNotice, PaymentNotice,
};
pub use patient_repository::{PatientFilter, PatientRecord, PatientRepositoryPort};
pub use product_repository::{
    ProductFilter, ProductRecord, ProductRepositoryPort, StockMovementRecord,
};
pub use repositories::{Page, PageRequest, RepositoryError};
pub use user_repository::{
    RefreshTokenRecord, RefreshTokenRepositoryPort, UserRecord, UserRepositoryPort,
};
