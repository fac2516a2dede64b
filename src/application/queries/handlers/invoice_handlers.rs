//! Invoice Query Handlers

use std::sync::Arc;

use crate::application::access::AccessPolicy;
use crate::application::error::ApplicationError;
use crate::application::ports::{InvoiceRecord, InvoiceRepositoryPort, Page};
use crate::application::queries::{GetInvoice, InvoiceDetails, ListInvoices};
use crate::domain::Permission;

/// GetInvoice Handler（含付款记录）
pub struct GetInvoiceHandler {
    policy: AccessPolicy,
    invoice_repo: Arc<dyn InvoiceRepositoryPort>,
}

impl GetInvoiceHandler {
    pub fn new(policy: AccessPolicy, invoice_repo: Arc<dyn InvoiceRepositoryPort>) -> Self {
        Self {
            policy,
            invoice_repo,
        }
    }

    pub async fn handle(&self, query: GetInvoice) -> Result<InvoiceDetails, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        let invoice = self
            .invoice_repo
            .find(query.actor.clinic_id, query.invoice_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Invoice", query.invoice_id))?;
        let payments = self.invoice_repo.payments(invoice.id).await?;

        Ok(InvoiceDetails { invoice, payments })
    }
}

/// ListInvoices Handler
pub struct ListInvoicesHandler {
    policy: AccessPolicy,
    invoice_repo: Arc<dyn InvoiceRepositoryPort>,
}

impl ListInvoicesHandler {
    pub fn new(policy: AccessPolicy, invoice_repo: Arc<dyn InvoiceRepositoryPort>) -> Self {
        Self {
            policy,
            invoice_repo,
        }
    }

    pub async fn handle(&self, query: ListInvoices) -> Result<Page<InvoiceRecord>, ApplicationError> {
        self.policy
            .authorize(&query.actor, Permission::ViewClinic)
            .await?;

        Ok(self
            .invoice_repo
            .list(query.actor.clinic_id, &query.filter, query.page)
            .await?)
    }
}
