//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::commands::handlers::{
    AddClinicMemberHandler, AdjustStockHandler, CancelInvoiceHandler, ChangePasswordHandler,
    CreateAppointmentHandler, CreateClinicHandler, CreateInvoiceHandler,
    CreateMedicalRecordHandler, CreatePatientHandler, CreateProductHandler,
    DeactivateClinicHandler, DeleteAppointmentHandler, DeleteInvoiceHandler,
    DeleteMedicalRecordHandler, DeletePatientHandler, DeleteProductHandler, GoogleLoginHandler,
    LoginHandler, LogoutHandler, RecordPaymentHandler, RefreshSessionHandler, RegisterHandler,
    RemoveMemberHandler, SendInvoiceHandler, SessionIssuer, UpdateAppointmentHandler,
    UpdateAppointmentStatusHandler, UpdateClinicHandler, UpdateInvoiceHandler,
    UpdateMedicalRecordHandler, UpdateMemberRoleHandler, UpdatePatientHandler,
    UpdateProductHandler, UpdateProfileHandler,
};
use crate::application::ports::{
    AppointmentRepositoryPort, ClinicAccessRepositoryPort, ClinicNotifierPort,
    ClinicRepositoryPort, DashboardRepositoryPort, IdentityProviderPort,
    InvoiceRepositoryPort, MedicalRecordRepositoryPort, PasswordHasherPort,
    PatientRepositoryPort, ProductRepositoryPort, RefreshTokenRepositoryPort, TokenServicePort,
    UserRepositoryPort,
};
use crate::application::queries::handlers::{
    CheckAvailabilityHandler, GetAppointmentHandler, GetClinicHandler, GetDashboardStatsHandler,
    GetInvoiceHandler, GetMeHandler, GetMedicalRecordHandler, GetPatientHandler,
    GetProductHandler, ListAppointmentsHandler, ListClinicMembersHandler, ListInvoicesHandler,
    ListLowStockProductsHandler, ListMedicalRecordsHandler, ListMyClinicsHandler,
    ListPatientsHandler, ListProductsHandler,
};
use crate::application::AccessPolicy;
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::memory::InMemoryRateLimiter;

/// 构建 AppState 所需的端口实现
pub struct AppPorts {
    pub user_repo: Arc<dyn UserRepositoryPort>,
    pub refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
    pub clinic_repo: Arc<dyn ClinicRepositoryPort>,
    pub access_repo: Arc<dyn ClinicAccessRepositoryPort>,
    pub patient_repo: Arc<dyn PatientRepositoryPort>,
    pub appointment_repo: Arc<dyn AppointmentRepositoryPort>,
    pub record_repo: Arc<dyn MedicalRecordRepositoryPort>,
    pub invoice_repo: Arc<dyn InvoiceRepositoryPort>,
    pub product_repo: Arc<dyn ProductRepositoryPort>,
    pub dashboard_repo: Arc<dyn DashboardRepositoryPort>,
    pub tokens: Arc<dyn TokenServicePort>,
    pub hasher: Arc<dyn PasswordHasherPort>,
    /// 未配置 Google client id 时为 None
    pub identity: Option<Arc<dyn IdentityProviderPort>>,
}

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub tokens: Arc<dyn TokenServicePort>,
    pub policy: AccessPolicy,
    pub publisher: Arc<EventPublisher>,
    pub rate_limiter: Arc<InMemoryRateLimiter>,

    // ========== Command Handlers ==========
    pub register_handler: RegisterHandler,
    pub login_handler: LoginHandler,
    pub google_login_handler: GoogleLoginHandler,
    pub refresh_session_handler: RefreshSessionHandler,
    pub logout_handler: LogoutHandler,
    pub update_profile_handler: UpdateProfileHandler,
    pub change_password_handler: ChangePasswordHandler,

    pub create_clinic_handler: CreateClinicHandler,
    pub update_clinic_handler: UpdateClinicHandler,
    pub deactivate_clinic_handler: DeactivateClinicHandler,
    pub add_clinic_member_handler: AddClinicMemberHandler,
    pub update_member_role_handler: UpdateMemberRoleHandler,
    pub remove_member_handler: RemoveMemberHandler,

    pub create_patient_handler: CreatePatientHandler,
    pub update_patient_handler: UpdatePatientHandler,
    pub delete_patient_handler: DeletePatientHandler,

    pub create_appointment_handler: CreateAppointmentHandler,
    pub update_appointment_handler: UpdateAppointmentHandler,
    pub update_appointment_status_handler: UpdateAppointmentStatusHandler,
    pub delete_appointment_handler: DeleteAppointmentHandler,

    pub create_medical_record_handler: CreateMedicalRecordHandler,
    pub update_medical_record_handler: UpdateMedicalRecordHandler,
    pub delete_medical_record_handler: DeleteMedicalRecordHandler,

    pub create_invoice_handler: CreateInvoiceHandler,
    pub update_invoice_handler: UpdateInvoiceHandler,
    pub send_invoice_handler: SendInvoiceHandler,
    pub record_payment_handler: RecordPaymentHandler,
    pub cancel_invoice_handler: CancelInvoiceHandler,
    pub delete_invoice_handler: DeleteInvoiceHandler,

    pub create_product_handler: CreateProductHandler,
    pub update_product_handler: UpdateProductHandler,
    pub adjust_stock_handler: AdjustStockHandler,
    pub delete_product_handler: DeleteProductHandler,

    // ========== Query Handlers ==========
    pub get_me_handler: GetMeHandler,
    pub get_clinic_handler: GetClinicHandler,
    pub list_my_clinics_handler: ListMyClinicsHandler,
    pub list_clinic_members_handler: ListClinicMembersHandler,
    pub get_patient_handler: GetPatientHandler,
    pub list_patients_handler: ListPatientsHandler,
    pub get_appointment_handler: GetAppointmentHandler,
    pub list_appointments_handler: ListAppointmentsHandler,
    pub check_availability_handler: CheckAvailabilityHandler,
    pub get_medical_record_handler: GetMedicalRecordHandler,
    pub list_medical_records_handler: ListMedicalRecordsHandler,
    pub get_invoice_handler: GetInvoiceHandler,
    pub list_invoices_handler: ListInvoicesHandler,
    pub get_product_handler: GetProductHandler,
    pub list_products_handler: ListProductsHandler,
    pub list_low_stock_products_handler: ListLowStockProductsHandler,
    pub get_dashboard_stats_handler: GetDashboardStatsHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        ports: AppPorts,
        publisher: Arc<EventPublisher>,
        rate_limiter: Arc<InMemoryRateLimiter>,
    ) -> Self {
        let AppPorts {
            user_repo,
            refresh_repo,
            clinic_repo,
            access_repo,
            patient_repo,
            appointment_repo,
            record_repo,
            invoice_repo,
            product_repo,
            dashboard_repo,
            tokens,
            hasher,
            identity,
        } = ports;

        let policy = AccessPolicy::new(access_repo.clone());
        let notifier: Arc<dyn ClinicNotifierPort> = publisher.clone();
        let issuer = SessionIssuer::new(tokens.clone(), refresh_repo.clone());

        Self {
            // Command handlers
            register_handler: RegisterHandler::new(
                user_repo.clone(),
                hasher.clone(),
                issuer.clone(),
            ),
            login_handler: LoginHandler::new(user_repo.clone(), hasher.clone(), issuer.clone()),
            google_login_handler: GoogleLoginHandler::new(
                identity,
                user_repo.clone(),
                issuer.clone(),
            ),
            refresh_session_handler: RefreshSessionHandler::new(
                tokens.clone(),
                refresh_repo.clone(),
                user_repo.clone(),
                issuer,
            ),
            logout_handler: LogoutHandler::new(tokens.clone(), refresh_repo.clone()),
            update_profile_handler: UpdateProfileHandler::new(user_repo.clone()),
            change_password_handler: ChangePasswordHandler::new(
                user_repo.clone(),
                hasher,
                refresh_repo,
            ),

            create_clinic_handler: CreateClinicHandler::new(clinic_repo.clone()),
            update_clinic_handler: UpdateClinicHandler::new(policy.clone(), clinic_repo.clone()),
            deactivate_clinic_handler: DeactivateClinicHandler::new(
                policy.clone(),
                clinic_repo.clone(),
            ),
            add_clinic_member_handler: AddClinicMemberHandler::new(
                policy.clone(),
                access_repo.clone(),
                user_repo.clone(),
            ),
            update_member_role_handler: UpdateMemberRoleHandler::new(
                policy.clone(),
                access_repo.clone(),
                user_repo.clone(),
            ),
            remove_member_handler: RemoveMemberHandler::new(policy.clone(), access_repo.clone()),

            create_patient_handler: CreatePatientHandler::new(policy.clone(), patient_repo.clone()),
            update_patient_handler: UpdatePatientHandler::new(policy.clone(), patient_repo.clone()),
            delete_patient_handler: DeletePatientHandler::new(policy.clone(), patient_repo.clone()),

            create_appointment_handler: CreateAppointmentHandler::new(
                policy.clone(),
                patient_repo.clone(),
                appointment_repo.clone(),
                notifier.clone(),
            ),
            update_appointment_handler: UpdateAppointmentHandler::new(
                policy.clone(),
                patient_repo.clone(),
                appointment_repo.clone(),
                notifier.clone(),
            ),
            update_appointment_status_handler: UpdateAppointmentStatusHandler::new(
                policy.clone(),
                appointment_repo.clone(),
                notifier.clone(),
            ),
            delete_appointment_handler: DeleteAppointmentHandler::new(
                policy.clone(),
                appointment_repo.clone(),
                notifier.clone(),
            ),

            create_medical_record_handler: CreateMedicalRecordHandler::new(
                policy.clone(),
                patient_repo.clone(),
                appointment_repo.clone(),
                record_repo.clone(),
                notifier.clone(),
            ),
            update_medical_record_handler: UpdateMedicalRecordHandler::new(
                policy.clone(),
                record_repo.clone(),
                notifier.clone(),
            ),
            delete_medical_record_handler: DeleteMedicalRecordHandler::new(
                policy.clone(),
                record_repo.clone(),
            ),

            create_invoice_handler: CreateInvoiceHandler::new(
                policy.clone(),
                patient_repo.clone(),
                product_repo.clone(),
                invoice_repo.clone(),
                notifier.clone(),
            ),
            update_invoice_handler: UpdateInvoiceHandler::new(
                policy.clone(),
                patient_repo.clone(),
                product_repo.clone(),
                invoice_repo.clone(),
            ),
            send_invoice_handler: SendInvoiceHandler::new(
                policy.clone(),
                invoice_repo.clone(),
                notifier.clone(),
            ),
            record_payment_handler: RecordPaymentHandler::new(
                policy.clone(),
                invoice_repo.clone(),
                notifier.clone(),
            ),
            cancel_invoice_handler: CancelInvoiceHandler::new(policy.clone(), invoice_repo.clone()),
            delete_invoice_handler: DeleteInvoiceHandler::new(policy.clone(), invoice_repo.clone()),

            create_product_handler: CreateProductHandler::new(policy.clone(), product_repo.clone()),
            update_product_handler: UpdateProductHandler::new(policy.clone(), product_repo.clone()),
            adjust_stock_handler: AdjustStockHandler::new(
                policy.clone(),
                product_repo.clone(),
                notifier,
            ),
            delete_product_handler: DeleteProductHandler::new(policy.clone(), product_repo.clone()),

            // Query handlers
            get_me_handler: GetMeHandler::new(user_repo),
            get_clinic_handler: GetClinicHandler::new(policy.clone(), clinic_repo.clone()),
            list_my_clinics_handler: ListMyClinicsHandler::new(clinic_repo),
            list_clinic_members_handler: ListClinicMembersHandler::new(
                policy.clone(),
                access_repo,
            ),
            get_patient_handler: GetPatientHandler::new(policy.clone(), patient_repo.clone()),
            list_patients_handler: ListPatientsHandler::new(policy.clone(), patient_repo),
            get_appointment_handler: GetAppointmentHandler::new(
                policy.clone(),
                appointment_repo.clone(),
            ),
            list_appointments_handler: ListAppointmentsHandler::new(
                policy.clone(),
                appointment_repo.clone(),
            ),
            check_availability_handler: CheckAvailabilityHandler::new(
                policy.clone(),
                appointment_repo,
            ),
            get_medical_record_handler: GetMedicalRecordHandler::new(
                policy.clone(),
                record_repo.clone(),
            ),
            list_medical_records_handler: ListMedicalRecordsHandler::new(
                policy.clone(),
                record_repo,
            ),
            get_invoice_handler: GetInvoiceHandler::new(policy.clone(), invoice_repo.clone()),
            list_invoices_handler: ListInvoicesHandler::new(policy.clone(), invoice_repo),
            get_product_handler: GetProductHandler::new(policy.clone(), product_repo.clone()),
            list_products_handler: ListProductsHandler::new(policy.clone(), product_repo.clone()),
            list_low_stock_products_handler: ListLowStockProductsHandler::new(
                policy.clone(),
                product_repo,
            ),
            get_dashboard_stats_handler: GetDashboardStatsHandler::new(
                policy.clone(),
                dashboard_repo,
            ),

            // Ports
            tokens,
            policy,
            publisher,
            rate_limiter,
        }
    }
}
