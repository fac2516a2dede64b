//! Invoice Command Handlers
//!
//! 发票生命周期 DRAFT → SENT → PARTIAL → PAID，
//! 每次付款后按已付总额重新判定状态

use chrono::{Datelike, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::access::AccessPolicy;
use crate::application::commands::{
    CancelInvoice, CreateInvoice, DeleteInvoice, LineItemInput, RecordPayment, SendInvoice,
    UpdateInvoice,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ClinicEvent, ClinicNotifierPort, InvoiceNotice, InvoiceRecord, InvoiceRepositoryPort,
    PatientRepositoryPort, PaymentNotice, PaymentRecord, ProductRepositoryPort, RepositoryError,
};
use crate::application::queries::InvoiceDetails;
use crate::domain::billing::{
    format_invoice_number, settle_payment, InvoiceStatus, InvoiceTotals, LineItem,
};
use crate::domain::validation::optional_text;
use crate::domain::Permission;

const NOTES_MAX: usize = 2000;
/// 编号撞车时的重试次数
const NUMBER_ATTEMPTS: u32 = 3;

pub(crate) fn invoice_notice(invoice: &InvoiceRecord) -> InvoiceNotice {
    InvoiceNotice {
        invoice_id: invoice.id,
        invoice_number: invoice.invoice_number.clone(),
        status: invoice.status,
        total_cents: invoice.totals.total_cents,
        balance_cents: invoice.balance_cents(),
    }
}

/// 明细与关联的患者/产品校验
struct InvoiceInputs {
    patient_repo: Arc<dyn PatientRepositoryPort>,
    product_repo: Arc<dyn ProductRepositoryPort>,
}

impl InvoiceInputs {
    async fn ensure_patient(
        &self,
        clinic_id: Uuid,
        patient_id: Option<Uuid>,
    ) -> Result<(), ApplicationError> {
        if let Some(patient_id) = patient_id {
            if self.patient_repo.find(clinic_id, patient_id).await?.is_none() {
                return Err(ApplicationError::not_found("Patient", patient_id));
            }
        }
        Ok(())
    }

    async fn line_items(
        &self,
        clinic_id: Uuid,
        inputs: &[LineItemInput],
    ) -> Result<Vec<LineItem>, ApplicationError> {
        let mut items = Vec::with_capacity(inputs.len());
        for input in inputs {
            if let Some(product_id) = input.product_id {
                if self.product_repo.find(clinic_id, product_id).await?.is_none() {
                    return Err(ApplicationError::not_found("Product", product_id));
                }
            }
            items.push(LineItem::new(
                &input.description,
                input.quantity,
                input.unit_price_cents,
                input.product_id,
            )?);
        }
        Ok(items)
    }
}

async fn load_invoice(
    repo: &dyn InvoiceRepositoryPort,
    clinic_id: Uuid,
    invoice_id: Uuid,
) -> Result<InvoiceRecord, ApplicationError> {
    repo.find(clinic_id, invoice_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Invoice", invoice_id))
}

// ============================================================================
// CreateInvoice
// ============================================================================

pub struct CreateInvoiceHandler {
    policy: AccessPolicy,
    inputs: InvoiceInputs,
    invoice_repo: Arc<dyn InvoiceRepositoryPort>,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl CreateInvoiceHandler {
    pub fn new(
        policy: AccessPolicy,
        patient_repo: Arc<dyn PatientRepositoryPort>,
        product_repo: Arc<dyn ProductRepositoryPort>,
        invoice_repo: Arc<dyn InvoiceRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            policy,
            inputs: InvoiceInputs {
                patient_repo,
                product_repo,
            },
            invoice_repo,
            notifier,
        }
    }

    pub async fn handle(&self, cmd: CreateInvoice) -> Result<InvoiceRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteInvoices)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        self.inputs.ensure_patient(clinic_id, cmd.patient_id).await?;
        let items = self.inputs.line_items(clinic_id, &cmd.items).await?;
        let totals = InvoiceTotals::compute(&items, cmd.tax_rate_bp, cmd.discount_cents)?;
        let notes = optional_text("notes", cmd.notes.as_deref(), NOTES_MAX)?;

        let now = Utc::now();
        let today = now.date_naive();
        let prefix = format!("INV-{:04}{:02}-", today.year(), today.month());

        let mut invoice = InvoiceRecord {
            id: Uuid::new_v4(),
            clinic_id,
            patient_id: cmd.patient_id,
            invoice_number: String::new(),
            status: InvoiceStatus::Draft,
            items,
            totals,
            amount_paid_cents: 0,
            due_date: cmd.due_date,
            notes,
            issued_at: None,
            paid_at: None,
            is_active: true,
            created_by: cmd.actor.user_id,
            created_at: now,
            updated_at: now,
        };

        // 编号 = 本月已有数量 + 1；并发创建撞号时重新计数
        let mut attempt = 0;
        loop {
            attempt += 1;
            let sequence = self
                .invoice_repo
                .count_numbers_with_prefix(clinic_id, &prefix)
                .await?
                + 1;
            invoice.invoice_number = format_invoice_number(today, sequence);

            match self.invoice_repo.insert(&invoice).await {
                Ok(()) => break,
                Err(RepositoryError::Duplicate(msg))
                    if attempt < NUMBER_ATTEMPTS =>
                {
                    tracing::debug!(
                        clinic_id = %clinic_id,
                        invoice_number = %invoice.invoice_number,
                        error = %msg,
                        "Invoice number taken, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            clinic_id = %clinic_id,
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total_cents = invoice.totals.total_cents,
            "Invoice created"
        );

        self.notifier
            .publish(clinic_id, ClinicEvent::InvoiceCreated(invoice_notice(&invoice)));

        Ok(invoice)
    }
}

// ============================================================================
// UpdateInvoice
// ============================================================================

pub struct UpdateInvoiceHandler {
    policy: AccessPolicy,
    inputs: InvoiceInputs,
    invoice_repo: Arc<dyn InvoiceRepositoryPort>,
}

impl UpdateInvoiceHandler {
    pub fn new(
        policy: AccessPolicy,
        patient_repo: Arc<dyn PatientRepositoryPort>,
        product_repo: Arc<dyn ProductRepositoryPort>,
        invoice_repo: Arc<dyn InvoiceRepositoryPort>,
    ) -> Self {
        Self {
            policy,
            inputs: InvoiceInputs {
                patient_repo,
                product_repo,
            },
            invoice_repo,
        }
    }

    pub async fn handle(&self, cmd: UpdateInvoice) -> Result<InvoiceRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteInvoices)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut invoice = load_invoice(self.invoice_repo.as_ref(), clinic_id, cmd.invoice_id).await?;

        if !invoice.status.is_editable() {
            return Err(ApplicationError::invalid_state(format!(
                "Invoice is {} and can no longer be edited",
                invoice.status
            )));
        }

        if cmd.patient_id.is_some() {
            self.inputs.ensure_patient(clinic_id, cmd.patient_id).await?;
            invoice.patient_id = cmd.patient_id;
        }
        if let Some(inputs) = cmd.items.as_deref() {
            invoice.items = self.inputs.line_items(clinic_id, inputs).await?;
        }
        invoice.totals = InvoiceTotals::compute(
            &invoice.items,
            cmd.tax_rate_bp.unwrap_or(invoice.totals.tax_rate_bp),
            cmd.discount_cents.unwrap_or(invoice.totals.discount_cents),
        )?;
        if cmd.due_date.is_some() {
            invoice.due_date = cmd.due_date;
        }
        if let Some(notes) = cmd.notes.as_deref() {
            invoice.notes = optional_text("notes", Some(notes), NOTES_MAX)?;
        }
        invoice.updated_at = Utc::now();

        self.invoice_repo.update(&invoice).await?;

        tracing::info!(
            clinic_id = %clinic_id,
            invoice_id = %invoice.id,
            total_cents = invoice.totals.total_cents,
            "Invoice updated"
        );

        Ok(invoice)
    }
}

// ============================================================================
// SendInvoice
// ============================================================================

pub struct SendInvoiceHandler {
    policy: AccessPolicy,
    invoice_repo: Arc<dyn InvoiceRepositoryPort>,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl SendInvoiceHandler {
    pub fn new(
        policy: AccessPolicy,
        invoice_repo: Arc<dyn InvoiceRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            policy,
            invoice_repo,
            notifier,
        }
    }

    /// 总额为 0 的发票发送后直接视为已付清
    pub async fn handle(&self, cmd: SendInvoice) -> Result<InvoiceRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteInvoices)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut invoice = load_invoice(self.invoice_repo.as_ref(), clinic_id, cmd.invoice_id).await?;

        let now = Utc::now();
        invoice.status = invoice.status.send()?;
        invoice.issued_at = Some(now);
        if invoice.totals.total_cents == 0 {
            invoice.status = InvoiceStatus::Paid;
            invoice.paid_at = Some(now);
        }
        invoice.updated_at = now;

        self.invoice_repo.update(&invoice).await?;

        tracing::info!(
            clinic_id = %clinic_id,
            invoice_id = %invoice.id,
            status = %invoice.status,
            "Invoice sent"
        );

        self.notifier
            .publish(clinic_id, ClinicEvent::InvoiceSent(invoice_notice(&invoice)));
        if invoice.status == InvoiceStatus::Paid {
            self.notifier
                .publish(clinic_id, ClinicEvent::InvoicePaid(invoice_notice(&invoice)));
        }

        Ok(invoice)
    }
}

// ============================================================================
// RecordPayment
// ============================================================================

pub struct RecordPaymentHandler {
    policy: AccessPolicy,
    invoice_repo: Arc<dyn InvoiceRepositoryPort>,
    notifier: Arc<dyn ClinicNotifierPort>,
}

impl RecordPaymentHandler {
    pub fn new(
        policy: AccessPolicy,
        invoice_repo: Arc<dyn InvoiceRepositoryPort>,
        notifier: Arc<dyn ClinicNotifierPort>,
    ) -> Self {
        Self {
            policy,
            invoice_repo,
            notifier,
        }
    }

    pub async fn handle(&self, cmd: RecordPayment) -> Result<InvoiceDetails, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteInvoices)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let invoice = load_invoice(self.invoice_repo.as_ref(), clinic_id, cmd.invoice_id).await?;

        settle_payment(
            invoice.status,
            invoice.totals.total_cents,
            invoice.amount_paid_cents,
            cmd.amount_cents,
        )?;

        let now = Utc::now();
        let payment = PaymentRecord {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            clinic_id,
            amount_cents: cmd.amount_cents,
            method: cmd.method,
            reference: optional_text("reference", cmd.reference.as_deref(), 120)?,
            paid_at: cmd.paid_at.unwrap_or(now),
            recorded_by: cmd.actor.user_id,
        };
        let Some(outcome) = self.invoice_repo.record_payment(&payment).await? else {
            return Err(self.payment_rejected(clinic_id, invoice.id, cmd.amount_cents).await);
        };

        tracing::info!(
            clinic_id = %clinic_id,
            invoice_id = %invoice.id,
            payment_id = %payment.id,
            amount_cents = payment.amount_cents,
            status = %outcome.status,
            balance_cents = outcome.balance_cents,
            "Payment recorded"
        );

        self.notifier.publish(
            clinic_id,
            ClinicEvent::PaymentRecorded(PaymentNotice {
                invoice_id: invoice.id,
                payment_id: payment.id,
                amount_cents: payment.amount_cents,
                status: outcome.status,
                balance_cents: outcome.balance_cents,
            }),
        );

        let invoice = load_invoice(self.invoice_repo.as_ref(), clinic_id, invoice.id).await?;
        if outcome.is_fully_paid() {
            self.notifier
                .publish(clinic_id, ClinicEvent::InvoicePaid(invoice_notice(&invoice)));
        }

        let payments = self.invoice_repo.payments(invoice.id).await?;
        Ok(InvoiceDetails { invoice, payments })
    }

    /// 写入时发票已被并发付款改变，按最新状态给出拒绝原因
    async fn payment_rejected(
        &self,
        clinic_id: Uuid,
        invoice_id: Uuid,
        amount_cents: i64,
    ) -> ApplicationError {
        let current = match load_invoice(self.invoice_repo.as_ref(), clinic_id, invoice_id).await {
            Ok(invoice) => invoice,
            Err(e) => return e,
        };

        tracing::warn!(
            clinic_id = %clinic_id,
            invoice_id = %invoice_id,
            amount_cents = amount_cents,
            status = %current.status,
            "Payment rejected after concurrent update"
        );

        match settle_payment(
            current.status,
            current.totals.total_cents,
            current.amount_paid_cents,
            amount_cents,
        ) {
            Err(e) => e.into(),
            Ok(_) => ApplicationError::conflict("Invoice changed while recording payment"),
        }
    }
}

// ============================================================================
// CancelInvoice
// ============================================================================

pub struct CancelInvoiceHandler {
    policy: AccessPolicy,
    invoice_repo: Arc<dyn InvoiceRepositoryPort>,
}

impl CancelInvoiceHandler {
    pub fn new(policy: AccessPolicy, invoice_repo: Arc<dyn InvoiceRepositoryPort>) -> Self {
        Self {
            policy,
            invoice_repo,
        }
    }

    pub async fn handle(&self, cmd: CancelInvoice) -> Result<InvoiceRecord, ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteInvoices)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut invoice = load_invoice(self.invoice_repo.as_ref(), clinic_id, cmd.invoice_id).await?;

        invoice.status = invoice.status.cancel()?;
        invoice.updated_at = Utc::now();
        self.invoice_repo.update(&invoice).await?;

        tracing::info!(clinic_id = %clinic_id, invoice_id = %invoice.id, "Invoice cancelled");
        Ok(invoice)
    }
}

// ============================================================================
// DeleteInvoice
// ============================================================================

pub struct DeleteInvoiceHandler {
    policy: AccessPolicy,
    invoice_repo: Arc<dyn InvoiceRepositoryPort>,
}

impl DeleteInvoiceHandler {
    pub fn new(policy: AccessPolicy, invoice_repo: Arc<dyn InvoiceRepositoryPort>) -> Self {
        Self {
            policy,
            invoice_repo,
        }
    }

    pub async fn handle(&self, cmd: DeleteInvoice) -> Result<(), ApplicationError> {
        self.policy
            .authorize(&cmd.actor, Permission::WriteInvoices)
            .await?;

        let clinic_id = cmd.actor.clinic_id;
        let mut invoice = load_invoice(self.invoice_repo.as_ref(), clinic_id, cmd.invoice_id).await?;

        if invoice.status != InvoiceStatus::Draft {
            return Err(ApplicationError::invalid_state(
                "Only draft invoices can be deleted; cancel it instead",
            ));
        }

        invoice.is_active = false;
        invoice.updated_at = Utc::now();
        self.invoice_repo.update(&invoice).await?;

        tracing::info!(clinic_id = %clinic_id, invoice_id = %invoice.id, "Invoice deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::Actor;
    use crate::application::queries::GetInvoice;
    use crate::domain::billing::PaymentMethod;
    use crate::test_support::TestApp;

    fn invoice_cmd(actor: Actor) -> CreateInvoice {
        CreateInvoice {
            actor,
            patient_id: None,
            items: vec![
                LineItemInput {
                    description: "Consultation".to_string(),
                    quantity: 1,
                    unit_price_cents: 5_000,
                    product_id: None,
                },
                LineItemInput {
                    description: "Deworming tablet".to_string(),
                    quantity: 2,
                    unit_price_cents: 2_500,
                    product_id: None,
                },
            ],
            tax_rate_bp: 1_000,
            discount_cents: 0,
            due_date: None,
            notes: None,
        }
    }

    fn payment(actor: Actor, invoice_id: Uuid, amount_cents: i64) -> RecordPayment {
        RecordPayment {
            actor,
            invoice_id,
            amount_cents,
            method: PaymentMethod::Card,
            reference: None,
            paid_at: None,
        }
    }

    async fn setup() -> (TestApp, Actor) {
        let app = TestApp::new().await;
        let owner = app.user("owner@example.com").await;
        let actor = Actor::new(owner.id, app.clinic(owner.id).await);
        (app, actor)
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential_per_month() {
        let (app, actor) = setup().await;

        let first = app
            .state
            .create_invoice_handler
            .handle(invoice_cmd(actor))
            .await
            .unwrap();
        let second = app
            .state
            .create_invoice_handler
            .handle(invoice_cmd(actor))
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        assert_eq!(first.invoice_number, format_invoice_number(today, 1));
        assert_eq!(second.invoice_number, format_invoice_number(today, 2));
        assert_eq!(first.status, InvoiceStatus::Draft);
        assert_eq!(first.totals.subtotal_cents, 10_000);
        assert_eq!(first.totals.tax_cents, 1_000);
        assert_eq!(first.totals.total_cents, 11_000);
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let (app, actor) = setup().await;
        let invoice = app
            .state
            .create_invoice_handler
            .handle(invoice_cmd(actor))
            .await
            .unwrap();

        // 草稿不能收款
        let err = app
            .state
            .record_payment_handler
            .handle(payment(actor, invoice.id, 1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidState(_)));

        let sent = app
            .state
            .send_invoice_handler
            .handle(SendInvoice {
                actor,
                invoice_id: invoice.id,
            })
            .await
            .unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);
        assert!(sent.issued_at.is_some());

        let mut rx = app.publisher.subscribe_clinic(actor.clinic_id);

        let details = app
            .state
            .record_payment_handler
            .handle(payment(actor, invoice.id, 4_000))
            .await
            .unwrap();
        assert_eq!(details.invoice.status, InvoiceStatus::Partial);
        assert_eq!(details.invoice.amount_paid_cents, 4_000);
        assert_eq!(details.invoice.balance_cents(), 7_000);
        assert!(details.invoice.paid_at.is_none());

        let err = app
            .state
            .record_payment_handler
            .handle(payment(actor, invoice.id, 8_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::BusinessRuleViolation(_)));

        let details = app
            .state
            .record_payment_handler
            .handle(payment(actor, invoice.id, 7_000))
            .await
            .unwrap();
        assert_eq!(details.invoice.status, InvoiceStatus::Paid);
        assert!(details.invoice.paid_at.is_some());
        assert_eq!(details.payments.len(), 2);

        let names: Vec<&str> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(ClinicEvent::name)
        .collect();
        assert_eq!(names, vec!["payment_recorded", "payment_recorded", "invoice_paid"]);
    }

    #[tokio::test]
    async fn test_concurrent_payments_cannot_overpay() {
        let (app, actor) = setup().await;
        let invoice = app
            .state
            .create_invoice_handler
            .handle(invoice_cmd(actor))
            .await
            .unwrap();
        app.state
            .send_invoice_handler
            .handle(SendInvoice {
                actor,
                invoice_id: invoice.id,
            })
            .await
            .unwrap();

        // 总额 11000，两笔 7000 只能有一笔成功
        let (a, b) = tokio::join!(
            app.state
                .record_payment_handler
                .handle(payment(actor, invoice.id, 7_000)),
            app.state
                .record_payment_handler
                .handle(payment(actor, invoice.id, 7_000)),
        );
        let ok = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(ok, 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, ApplicationError::BusinessRuleViolation(_)));

        let stored = app
            .state
            .get_invoice_handler
            .handle(GetInvoice {
                actor,
                invoice_id: invoice.id,
            })
            .await
            .unwrap();
        assert_eq!(stored.invoice.amount_paid_cents, 7_000);
        assert_eq!(stored.invoice.status, InvoiceStatus::Partial);
        assert_eq!(stored.payments.len(), 1);

        // 剩余 4000 的并发付款：一笔付清，另一笔被拒
        let (a, b) = tokio::join!(
            app.state
                .record_payment_handler
                .handle(payment(actor, invoice.id, 4_000)),
            app.state
                .record_payment_handler
                .handle(payment(actor, invoice.id, 4_000)),
        );
        let paid = a.ok().or(b.ok()).unwrap();
        assert_eq!(paid.invoice.status, InvoiceStatus::Paid);
        assert_eq!(paid.invoice.amount_paid_cents, 11_000);
        assert_eq!(paid.payments.len(), 2);
    }

    #[tokio::test]
    async fn test_only_draft_invoices_are_editable() {
        let (app, actor) = setup().await;
        let invoice = app
            .state
            .create_invoice_handler
            .handle(invoice_cmd(actor))
            .await
            .unwrap();

        let updated = app
            .state
            .update_invoice_handler
            .handle(UpdateInvoice {
                actor,
                invoice_id: invoice.id,
                patient_id: None,
                items: None,
                tax_rate_bp: Some(0),
                discount_cents: Some(500),
                due_date: None,
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(updated.totals.total_cents, 9_500);

        app.state
            .send_invoice_handler
            .handle(SendInvoice {
                actor,
                invoice_id: invoice.id,
            })
            .await
            .unwrap();

        let err = app
            .state
            .update_invoice_handler
            .handle(UpdateInvoice {
                actor,
                invoice_id: invoice.id,
                patient_id: None,
                items: None,
                tax_rate_bp: None,
                discount_cents: Some(0),
                due_date: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidState(_)));

        let err = app
            .state
            .delete_invoice_handler
            .handle(DeleteInvoice {
                actor,
                invoice_id: invoice.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_partially_paid_invoice_cannot_be_cancelled() {
        let (app, actor) = setup().await;
        let invoice = app
            .state
            .create_invoice_handler
            .handle(invoice_cmd(actor))
            .await
            .unwrap();
        app.state
            .send_invoice_handler
            .handle(SendInvoice {
                actor,
                invoice_id: invoice.id,
            })
            .await
            .unwrap();
        app.state
            .record_payment_handler
            .handle(payment(actor, invoice.id, 100))
            .await
            .unwrap();

        let err = app
            .state
            .cancel_invoice_handler
            .handle(CancelInvoice {
                actor,
                invoice_id: invoice.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_zero_total_invoice_is_paid_on_send() {
        let (app, actor) = setup().await;
        let mut cmd = invoice_cmd(actor);
        cmd.items.truncate(1);
        cmd.items[0].unit_price_cents = 0;

        let invoice = app.state.create_invoice_handler.handle(cmd).await.unwrap();
        let sent = app
            .state
            .send_invoice_handler
            .handle(SendInvoice {
                actor,
                invoice_id: invoice.id,
            })
            .await
            .unwrap();
        assert_eq!(sent.status, InvoiceStatus::Paid);
        assert!(sent.paid_at.is_some());
    }
}
