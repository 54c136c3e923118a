//! Abstractions over persistence and explanation backends
//!
//! The core is storage-agnostic: every public operation runs against a
//! [`ReconciliationStorage`], and the bundled
//! [`MemoryStore`](crate::utils::MemoryStore) is just one implementation.

use async_trait::async_trait;

use crate::types::{
    BankTransaction, ExplainContext, ImportIdempotencyRecord, Invoice, InvoiceFilter,
    InvoiceStatus, Match, MatchStatus, NewBankTransaction, NewImportRecord, NewInvoice, NewMatch,
    ReconcileResult, Tenant,
};

/// Storage abstraction for reconciliation data
///
/// Implementations provide atomic sessions: a session's writes become
/// visible to other sessions only on [`StorageSession::commit`], and are
/// discarded on [`StorageSession::rollback`] or drop.
#[async_trait]
pub trait ReconciliationStorage: Send + Sync {
    /// Open a new session against the current committed state
    async fn begin(&self) -> ReconcileResult<Box<dyn StorageSession>>;
}

/// One unit of work against a [`ReconciliationStorage`]
///
/// Reads observe the session's own uncommitted writes. Every method that
/// takes a `tenant_id` is scoped to that tenant and must never observe or
/// touch rows owned by another tenant.
#[async_trait]
pub trait StorageSession: Send {
    /// Insert a tenant; fails with `Conflict` if the name is taken
    async fn insert_tenant(&mut self, name: &str) -> ReconcileResult<Tenant>;

    /// Fetch a tenant by id
    async fn get_tenant(&mut self, tenant_id: i64) -> ReconcileResult<Option<Tenant>>;

    /// List all tenants in ascending id order
    async fn list_tenants(&mut self) -> ReconcileResult<Vec<Tenant>>;

    /// Insert an invoice; the stored row starts [`InvoiceStatus::Open`]
    async fn insert_invoice(&mut self, invoice: NewInvoice) -> ReconcileResult<Invoice>;

    /// Fetch an invoice by id within a tenant
    async fn get_invoice(
        &mut self,
        tenant_id: i64,
        invoice_id: i64,
    ) -> ReconcileResult<Option<Invoice>>;

    /// List a tenant's invoices matching `filter`, in ascending id order
    async fn list_invoices(
        &mut self,
        tenant_id: i64,
        filter: &InvoiceFilter,
    ) -> ReconcileResult<Vec<Invoice>>;

    /// Set an invoice's status; fails with `InvoiceNotFound` if missing
    async fn update_invoice_status(
        &mut self,
        tenant_id: i64,
        invoice_id: i64,
        status: InvoiceStatus,
    ) -> ReconcileResult<()>;

    /// Delete an invoice; fails with `InvoiceNotFound` if missing
    async fn delete_invoice(&mut self, tenant_id: i64, invoice_id: i64) -> ReconcileResult<()>;

    /// Insert a bank transaction
    async fn insert_bank_transaction(
        &mut self,
        transaction: NewBankTransaction,
    ) -> ReconcileResult<BankTransaction>;

    /// Fetch a bank transaction by id within a tenant
    async fn get_bank_transaction(
        &mut self,
        tenant_id: i64,
        transaction_id: i64,
    ) -> ReconcileResult<Option<BankTransaction>>;

    /// List a tenant's bank transactions in ascending id order
    async fn list_bank_transactions(
        &mut self,
        tenant_id: i64,
    ) -> ReconcileResult<Vec<BankTransaction>>;

    /// Look up a bank transaction by its bank-side external id
    async fn find_bank_transaction_by_external_id(
        &mut self,
        tenant_id: i64,
        external_id: &str,
    ) -> ReconcileResult<Option<BankTransaction>>;

    /// Insert a match; fails with `Conflict` if the (invoice, transaction)
    /// pair already has one
    async fn insert_match(&mut self, proposal: NewMatch) -> ReconcileResult<Match>;

    /// Fetch a match by id within a tenant
    async fn get_match(&mut self, tenant_id: i64, match_id: i64)
        -> ReconcileResult<Option<Match>>;

    /// List a tenant's matches, optionally narrowed to one invoice or one
    /// status, in ascending id order
    async fn list_matches(
        &mut self,
        tenant_id: i64,
        invoice_id: Option<i64>,
        status: Option<MatchStatus>,
    ) -> ReconcileResult<Vec<Match>>;

    /// Delete every proposed match for a tenant, returning the count
    async fn delete_proposed_matches(&mut self, tenant_id: i64) -> ReconcileResult<usize>;

    /// Fetch the confirmed match for an invoice, if any
    async fn find_confirmed_match_for_invoice(
        &mut self,
        tenant_id: i64,
        invoice_id: i64,
    ) -> ReconcileResult<Option<Match>>;

    /// Set a match's status; fails with `MatchNotFound` if missing
    async fn update_match_status(
        &mut self,
        tenant_id: i64,
        match_id: i64,
        status: MatchStatus,
    ) -> ReconcileResult<()>;

    /// Fetch the replay record for an idempotency key
    async fn get_import_record(
        &mut self,
        tenant_id: i64,
        key: &str,
    ) -> ReconcileResult<Option<ImportIdempotencyRecord>>;

    /// Insert a replay record; fails with `Conflict` if the key is taken
    async fn insert_import_record(
        &mut self,
        record: NewImportRecord,
    ) -> ReconcileResult<ImportIdempotencyRecord>;

    /// Publish this session's writes
    async fn commit(self: Box<Self>) -> ReconcileResult<()>;

    /// Discard this session's writes
    async fn rollback(self: Box<Self>) -> ReconcileResult<()>;
}

/// Pluggable narrative generator for match explanations
///
/// Failures are soft: the explain service logs them and falls back to a
/// deterministic summary built from the stored reason codes.
#[async_trait]
pub trait AiExplainer: Send + Sync {
    /// Produce a short narrative for the match described by `context`
    async fn explain(&self, context: &ExplainContext) -> ReconcileResult<String>;
}

/// Configuration for the AI explainer backend
#[derive(Debug, Clone, Default)]
pub struct AiConfig {
    /// Provider API key; `None` disables AI narratives entirely
    pub api_key: Option<String>,
}

impl AiConfig {
    /// Read configuration from the environment
    ///
    /// Looks at `AI_API_KEY`; an unset or empty variable leaves the key
    /// absent, which routes every explanation through the fallback path.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("AI_API_KEY").ok().filter(|v| !v.is_empty()),
        }
    }
}
