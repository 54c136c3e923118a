//! Invoice administration
//!
//! Invoices enter the system here and leave the open pool only through
//! match confirmation. The reconciliation engine reads them; it never
//! creates or deletes them.

use bigdecimal::BigDecimal;

use crate::traits::ReconciliationStorage;
use crate::types::{Invoice, InvoiceFilter, NewInvoice, ReconcileError, ReconcileResult};

/// Creates, looks up, and removes invoices
pub struct InvoiceManager<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> InvoiceManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create an invoice
    ///
    /// The amount must be strictly positive; the stored invoice starts in
    /// the open state.
    pub async fn create(&mut self, invoice: NewInvoice) -> ReconcileResult<Invoice> {
        if invoice.amount <= BigDecimal::from(0) {
            return Err(ReconcileError::InvalidArgument(
                "invoice amount must be > 0".to_string(),
            ));
        }

        let mut session = self.storage.begin().await?;
        match session.insert_invoice(invoice).await {
            Ok(created) => {
                session.commit().await?;
                Ok(created)
            }
            Err(e) => {
                session.rollback().await?;
                Err(e)
            }
        }
    }

    /// Fetch an invoice, failing with `InvoiceNotFound` if it is absent
    /// for the tenant
    pub async fn get(&self, tenant_id: i64, invoice_id: i64) -> ReconcileResult<Invoice> {
        let mut session = self.storage.begin().await?;
        let found = session.get_invoice(tenant_id, invoice_id).await;
        session.rollback().await?;
        found?.ok_or(ReconcileError::InvoiceNotFound(invoice_id))
    }

    /// List a tenant's invoices matching `filter`, in ascending id order
    pub async fn list(
        &self,
        tenant_id: i64,
        filter: &InvoiceFilter,
    ) -> ReconcileResult<Vec<Invoice>> {
        let mut session = self.storage.begin().await?;
        let invoices = session.list_invoices(tenant_id, filter).await;
        session.rollback().await?;
        invoices
    }

    /// Delete an invoice, failing with `InvoiceNotFound` if it is absent
    /// for the tenant
    pub async fn delete(&mut self, tenant_id: i64, invoice_id: i64) -> ReconcileResult<()> {
        let mut session = self.storage.begin().await?;
        match session.delete_invoice(tenant_id, invoice_id).await {
            Ok(()) => {
                session.commit().await?;
                Ok(())
            }
            Err(e) => {
                session.rollback().await?;
                Err(e)
            }
        }
    }
}
