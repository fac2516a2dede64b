//! Invoice HTTP Handlers - 发票与收款

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{
    CancelInvoice, CreateInvoice, DeleteInvoice, LineItemInput, RecordPayment, SendInvoice,
    UpdateInvoice,
};
use crate::application::ports::{InvoiceFilter, InvoiceRecord, PageRequest, PaymentRecord};
use crate::application::queries::{GetInvoice, InvoiceDetails, ListInvoices};
use crate::domain::billing::{InvoiceStatus, LineItem, PaymentMethod};
use crate::infrastructure::http::dto::{timestamp, ApiResponse, Empty, PageResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub product_id: Option<Uuid>,
}

impl From<LineItemRequest> for LineItemInput {
    fn from(item: LineItemRequest) -> Self {
        Self {
            description: item.description,
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            product_id: item.product_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub patient_id: Option<Uuid>,
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub tax_rate_bp: u32,
    #[serde(default)]
    pub discount_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceRequest {
    pub patient_id: Option<Uuid>,
    pub items: Option<Vec<LineItemRequest>>,
    pub tax_rate_bp: Option<u32>,
    pub discount_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<InvoiceStatus>,
    pub patient_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_at: String,
    pub recorded_by: Uuid,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(p: PaymentRecord) -> Self {
        Self {
            id: p.id,
            amount_cents: p.amount_cents,
            method: p.method,
            reference: p.reference,
            paid_at: timestamp(p.paid_at),
            recorded_by: p.recorded_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub items: Vec<LineItem>,
    pub subtotal_cents: i64,
    pub tax_rate_bp: u32,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub balance_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub issued_at: Option<String>,
    pub paid_at: Option<String>,
    pub created_by: Uuid,
    pub created_at: String,
    pub updated_at: String,
    /// 仅详情接口返回
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<Vec<PaymentResponse>>,
}

impl From<InvoiceRecord> for InvoiceResponse {
    fn from(i: InvoiceRecord) -> Self {
        Self {
            id: i.id,
            clinic_id: i.clinic_id,
            patient_id: i.patient_id,
            invoice_number: i.invoice_number,
            status: i.status,
            items: i.items,
            subtotal_cents: i.totals.subtotal_cents,
            tax_rate_bp: i.totals.tax_rate_bp,
            tax_cents: i.totals.tax_cents,
            discount_cents: i.totals.discount_cents,
            total_cents: i.totals.total_cents,
            amount_paid_cents: i.amount_paid_cents,
            balance_cents: i.totals.total_cents - i.amount_paid_cents,
            due_date: i.due_date,
            notes: i.notes,
            issued_at: i.issued_at.map(timestamp),
            paid_at: i.paid_at.map(timestamp),
            created_by: i.created_by,
            created_at: timestamp(i.created_at),
            updated_at: timestamp(i.updated_at),
            payments: None,
        }
    }
}

impl From<InvoiceDetails> for InvoiceResponse {
    fn from(details: InvoiceDetails) -> Self {
        Self {
            payments: Some(
                details
                    .payments
                    .into_iter()
                    .map(PaymentResponse::from)
                    .collect(),
            ),
            ..details.invoice.into()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/clinics/:clinic_id/invoices
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListInvoicesQuery>,
) -> Result<Json<ApiResponse<PageResponse<InvoiceResponse>>>, ApiError> {
    let page = state
        .list_invoices_handler
        .handle(ListInvoices {
            actor: user.in_clinic(clinic_id),
            filter: InvoiceFilter {
                status: query.status,
                patient_id: query.patient_id,
                search: query.search,
            },
            page: PageRequest::new(query.page, query.limit),
        })
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::from_page(page))))
}

/// POST /api/clinics/:clinic_id/invoices
pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InvoiceResponse>>), ApiError> {
    let invoice = state
        .create_invoice_handler
        .handle(CreateInvoice {
            actor: user.in_clinic(clinic_id),
            patient_id: req.patient_id,
            items: req.items.into_iter().map(LineItemInput::from).collect(),
            tax_rate_bp: req.tax_rate_bp,
            discount_cents: req.discount_cents,
            due_date: req.due_date,
            notes: req.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(invoice.into()))))
}

/// GET /api/clinics/:clinic_id/invoices/:invoice_id
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, invoice_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, ApiError> {
    let details = state
        .get_invoice_handler
        .handle(GetInvoice {
            actor: user.in_clinic(clinic_id),
            invoice_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(details.into())))
}

/// PATCH /api/clinics/:clinic_id/invoices/:invoice_id
pub async fn update_invoice(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, invoice_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateInvoiceRequest>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, ApiError> {
    let invoice = state
        .update_invoice_handler
        .handle(UpdateInvoice {
            actor: user.in_clinic(clinic_id),
            invoice_id,
            patient_id: req.patient_id,
            items: req
                .items
                .map(|items| items.into_iter().map(LineItemInput::from).collect()),
            tax_rate_bp: req.tax_rate_bp,
            discount_cents: req.discount_cents,
            due_date: req.due_date,
            notes: req.notes,
        })
        .await?;

    Ok(Json(ApiResponse::success(invoice.into())))
}

/// POST /api/clinics/:clinic_id/invoices/:invoice_id/send
pub async fn send_invoice(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, invoice_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, ApiError> {
    let invoice = state
        .send_invoice_handler
        .handle(SendInvoice {
            actor: user.in_clinic(clinic_id),
            invoice_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(invoice.into())))
}

/// POST /api/clinics/:clinic_id/invoices/:invoice_id/payments
pub async fn record_payment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, invoice_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InvoiceResponse>>), ApiError> {
    let details = state
        .record_payment_handler
        .handle(RecordPayment {
            actor: user.in_clinic(clinic_id),
            invoice_id,
            amount_cents: req.amount_cents,
            method: req.method,
            reference: req.reference,
            paid_at: req.paid_at,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(details.into()))))
}

/// POST /api/clinics/:clinic_id/invoices/:invoice_id/cancel
pub async fn cancel_invoice(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, invoice_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, ApiError> {
    let invoice = state
        .cancel_invoice_handler
        .handle(CancelInvoice {
            actor: user.in_clinic(clinic_id),
            invoice_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(invoice.into())))
}

/// DELETE /api/clinics/:clinic_id/invoices/:invoice_id
pub async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath((clinic_id, invoice_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_invoice_handler
        .handle(DeleteInvoice {
            actor: user.in_clinic(clinic_id),
            invoice_id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}
