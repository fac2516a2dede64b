//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                                   GET
//! - /api/auth/{register,login,google,refresh,logout}  POST
//! - /api/auth/me                                GET | PATCH
//! - /api/auth/change-password                   POST
//! - /api/clinics                                GET | POST
//! - /api/clinics/:clinic_id                     GET | PATCH | DELETE
//! - /api/clinics/:clinic_id/members[/:user_id]
//! - /api/clinics/:clinic_id/patients[/:id]
//! - /api/clinics/:clinic_id/appointments[/:id]  + /availability, /:id/status
//! - /api/clinics/:clinic_id/medical-records[/:id]
//! - /api/clinics/:clinic_id/invoices[/:id]      + /:id/{send,payments,cancel}
//! - /api/clinics/:clinic_id/products[/:id]      + /low-stock, /:id/stock
//! - /api/clinics/:clinic_id/dashboard           GET
//! - /ws/clinics/:clinic_id?token=               WS  诊所实时事件

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route(
            "/ws/clinics/:clinic_id",
            get(handlers::clinic_websocket_handler),
        )
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/auth", auth_routes())
        .nest("/clinics", clinic_routes())
}

/// Auth 路由
fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/google", post(handlers::google_login))
        .route("/refresh", post(handlers::refresh_token))
        .route("/logout", post(handlers::logout))
        .route(
            "/me",
            get(handlers::get_me).patch(handlers::update_profile),
        )
        .route("/change-password", post(handlers::change_password))
}

/// Clinic 路由，诊所内资源都挂在 /:clinic_id 下
fn clinic_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::list_my_clinics).post(handlers::create_clinic),
        )
        .route(
            "/:clinic_id",
            get(handlers::get_clinic)
                .patch(handlers::update_clinic)
                .delete(handlers::deactivate_clinic),
        )
        .route("/:clinic_id/dashboard", get(handlers::get_dashboard))
        .merge(member_routes())
        .merge(patient_routes())
        .merge(appointment_routes())
        .merge(medical_record_routes())
        .merge(invoice_routes())
        .merge(product_routes())
}

/// Member 路由
fn member_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:clinic_id/members",
            get(handlers::list_members).post(handlers::add_member),
        )
        .route(
            "/:clinic_id/members/:user_id",
            patch(handlers::update_member).delete(handlers::remove_member),
        )
}

/// Patient 路由
fn patient_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:clinic_id/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/:clinic_id/patients/:patient_id",
            get(handlers::get_patient)
                .patch(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
}

/// Appointment 路由
fn appointment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:clinic_id/appointments",
            get(handlers::list_appointments).post(handlers::create_appointment),
        )
        .route(
            "/:clinic_id/appointments/availability",
            post(handlers::check_availability),
        )
        .route(
            "/:clinic_id/appointments/:appointment_id",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route(
            "/:clinic_id/appointments/:appointment_id/status",
            post(handlers::update_appointment_status),
        )
}

/// Medical record 路由
fn medical_record_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:clinic_id/medical-records",
            get(handlers::list_medical_records).post(handlers::create_medical_record),
        )
        .route(
            "/:clinic_id/medical-records/:record_id",
            get(handlers::get_medical_record)
                .patch(handlers::update_medical_record)
                .delete(handlers::delete_medical_record),
        )
}

/// Invoice 路由
fn invoice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:clinic_id/invoices",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route(
            "/:clinic_id/invoices/:invoice_id",
            get(handlers::get_invoice)
                .patch(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        .route("/:clinic_id/invoices/:invoice_id/send", post(handlers::send_invoice))
        .route(
            "/:clinic_id/invoices/:invoice_id/payments",
            post(handlers::record_payment),
        )
        .route(
            "/:clinic_id/invoices/:invoice_id/cancel",
            post(handlers::cancel_invoice),
        )
}

/// Product 路由
fn product_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:clinic_id/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:clinic_id/products/low-stock",
            get(handlers::list_low_stock_products),
        )
        .route(
            "/:clinic_id/products/:product_id",
            get(handlers::get_product)
                .patch(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/:clinic_id/products/:product_id/stock",
            post(handlers::adjust_stock),
        )
}
