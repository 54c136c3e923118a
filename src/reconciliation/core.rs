//! Top-level facade coordinating ingestion, reconciliation, and lifecycle

use std::sync::Arc;

use crate::ingest::TransactionImporter;
use crate::invoices::InvoiceManager;
use crate::reconciliation::confirm::MatchConfirmer;
use crate::reconciliation::engine::ReconciliationEngine;
use crate::reconciliation::explain::ExplainService;
use crate::tenants::TenantManager;
use crate::traits::*;
use crate::types::*;

/// One handle over the whole reconciliation system
///
/// Bundles every manager behind a single storage backend. Each operation
/// still runs in its own session; the facade adds no shared state.
pub struct Reconciler<S: ReconciliationStorage> {
    tenant_manager: TenantManager<S>,
    invoice_manager: InvoiceManager<S>,
    importer: TransactionImporter<S>,
    engine: ReconciliationEngine<S>,
    confirmer: MatchConfirmer<S>,
    explain_service: ExplainService<S>,
}

impl<S: ReconciliationStorage + Clone> Reconciler<S> {
    /// Create a reconciler over the given storage backend
    pub fn new(storage: S, ai_config: AiConfig) -> Self {
        Self {
            tenant_manager: TenantManager::new(storage.clone()),
            invoice_manager: InvoiceManager::new(storage.clone()),
            importer: TransactionImporter::new(storage.clone()),
            engine: ReconciliationEngine::new(storage.clone()),
            confirmer: MatchConfirmer::new(storage.clone()),
            explain_service: ExplainService::new(storage, &ai_config),
        }
    }

    /// Create a reconciler with a caller-provided explainer
    pub fn with_explainer(storage: S, explainer: Arc<dyn AiExplainer>) -> Self {
        Self {
            tenant_manager: TenantManager::new(storage.clone()),
            invoice_manager: InvoiceManager::new(storage.clone()),
            importer: TransactionImporter::new(storage.clone()),
            engine: ReconciliationEngine::new(storage.clone()),
            confirmer: MatchConfirmer::new(storage.clone()),
            explain_service: ExplainService::with_explainer(storage, explainer),
        }
    }

    // Tenant operations
    /// Create a tenant
    pub async fn create_tenant(&mut self, name: &str) -> ReconcileResult<Tenant> {
        self.tenant_manager.create(name).await
    }

    /// Get a tenant by id
    pub async fn get_tenant(&self, tenant_id: i64) -> ReconcileResult<Tenant> {
        self.tenant_manager.get(tenant_id).await
    }

    /// List all tenants
    pub async fn list_tenants(&self) -> ReconcileResult<Vec<Tenant>> {
        self.tenant_manager.list().await
    }

    // Invoice operations
    /// Create an invoice
    pub async fn create_invoice(&mut self, invoice: NewInvoice) -> ReconcileResult<Invoice> {
        self.invoice_manager.create(invoice).await
    }

    /// Get an invoice by id
    pub async fn get_invoice(&self, tenant_id: i64, invoice_id: i64) -> ReconcileResult<Invoice> {
        self.invoice_manager.get(tenant_id, invoice_id).await
    }

    /// List invoices matching a filter
    pub async fn list_invoices(
        &self,
        tenant_id: i64,
        filter: &InvoiceFilter,
    ) -> ReconcileResult<Vec<Invoice>> {
        self.invoice_manager.list(tenant_id, filter).await
    }

    /// Delete an invoice
    pub async fn delete_invoice(&mut self, tenant_id: i64, invoice_id: i64) -> ReconcileResult<()> {
        self.invoice_manager.delete(tenant_id, invoice_id).await
    }

    // Bank transaction ingestion
    /// Import a batch of bank transactions exactly once per (key, payload)
    pub async fn import_transactions(
        &mut self,
        tenant_id: i64,
        idempotency_key: &str,
        items: &[TransactionInput],
    ) -> ReconcileResult<ImportResult> {
        self.importer
            .import_batch(tenant_id, idempotency_key, items)
            .await
    }

    // Reconciliation operations
    /// Run reconciliation for a tenant, replacing its proposed matches
    pub async fn reconcile(
        &mut self,
        tenant_id: i64,
        window_days: u32,
        max_candidates_per_invoice: usize,
    ) -> ReconcileResult<Vec<Match>> {
        self.engine
            .reconcile(tenant_id, window_days, max_candidates_per_invoice)
            .await
    }

    /// Confirm a proposed match and mark its invoice matched
    pub async fn confirm_match(&mut self, tenant_id: i64, match_id: i64) -> ReconcileResult<Match> {
        self.confirmer.confirm(tenant_id, match_id).await
    }

    /// Explain the scoring of one invoice/transaction pair
    pub async fn explain(
        &self,
        tenant_id: i64,
        invoice_id: i64,
        transaction_id: i64,
    ) -> ReconcileResult<Explanation> {
        self.explain_service
            .explain(tenant_id, invoice_id, transaction_id)
            .await
    }
}
