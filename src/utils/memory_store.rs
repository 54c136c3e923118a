//! In-memory storage implementation for testing and development
//!
//! Sessions snapshot the whole store at `begin` and publish the snapshot
//! wholesale at `commit`; a session's reads always observe its own staged
//! writes. Concurrent sessions are last-writer-wins, which is adequate for
//! tests and demos but not for contended production use.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory reconciliation store
///
/// Identifiers are sequences scoped per tenant, so numeric ids collide
/// across tenants; anything that forgets a tenant filter shows up quickly.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        *self.state.write().unwrap() = StoreState::default();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReconciliationStorage for MemoryStore {
    async fn begin(&self) -> ReconcileResult<Box<dyn StorageSession>> {
        let snapshot = self.state.read().unwrap().clone();
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.state),
            state: snapshot,
        }))
    }
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    tenants: i64,
    invoices: HashMap<i64, i64>,
    transactions: HashMap<i64, i64>,
    matches: HashMap<i64, i64>,
}

/// Entity maps are keyed by (tenant id, entity id) so range scans yield a
/// tenant's rows in ascending id order.
#[derive(Debug, Clone, Default)]
struct StoreState {
    tenants: BTreeMap<i64, Tenant>,
    invoices: BTreeMap<(i64, i64), Invoice>,
    transactions: BTreeMap<(i64, i64), BankTransaction>,
    matches: BTreeMap<(i64, i64), Match>,
    import_records: BTreeMap<(i64, String), ImportIdempotencyRecord>,
    sequences: Sequences,
}

impl StoreState {
    fn next_tenant_id(&mut self) -> i64 {
        self.sequences.tenants += 1;
        self.sequences.tenants
    }

    fn next_invoice_id(&mut self, tenant_id: i64) -> i64 {
        let seq = self.sequences.invoices.entry(tenant_id).or_insert(0);
        *seq += 1;
        *seq
    }

    fn next_transaction_id(&mut self, tenant_id: i64) -> i64 {
        let seq = self.sequences.transactions.entry(tenant_id).or_insert(0);
        *seq += 1;
        *seq
    }

    fn next_match_id(&mut self, tenant_id: i64) -> i64 {
        let seq = self.sequences.matches.entry(tenant_id).or_insert(0);
        *seq += 1;
        *seq
    }
}

/// One snapshot-backed unit of work against a [`MemoryStore`]
pub struct MemorySession {
    shared: Arc<RwLock<StoreState>>,
    state: StoreState,
}

fn tenant_range(tenant_id: i64) -> std::ops::RangeInclusive<(i64, i64)> {
    (tenant_id, i64::MIN)..=(tenant_id, i64::MAX)
}

#[async_trait]
impl StorageSession for MemorySession {
    async fn insert_tenant(&mut self, name: &str) -> ReconcileResult<Tenant> {
        if self.state.tenants.values().any(|t| t.name == name) {
            return Err(ReconcileError::Conflict(format!(
                "tenant name already exists: {name}"
            )));
        }

        let tenant = Tenant {
            id: self.state.next_tenant_id(),
            name: name.to_string(),
            created_at: Utc::now().naive_utc(),
        };
        self.state.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn get_tenant(&mut self, tenant_id: i64) -> ReconcileResult<Option<Tenant>> {
        Ok(self.state.tenants.get(&tenant_id).cloned())
    }

    async fn list_tenants(&mut self) -> ReconcileResult<Vec<Tenant>> {
        Ok(self.state.tenants.values().cloned().collect())
    }

    async fn insert_invoice(&mut self, invoice: NewInvoice) -> ReconcileResult<Invoice> {
        let stored = Invoice {
            id: self.state.next_invoice_id(invoice.tenant_id),
            tenant_id: invoice.tenant_id,
            amount: invoice.amount,
            currency: invoice.currency,
            invoice_date: invoice.invoice_date,
            description: invoice.description,
            status: InvoiceStatus::Open,
            created_at: Utc::now().naive_utc(),
        };
        self.state
            .invoices
            .insert((stored.tenant_id, stored.id), stored.clone());
        Ok(stored)
    }

    async fn get_invoice(
        &mut self,
        tenant_id: i64,
        invoice_id: i64,
    ) -> ReconcileResult<Option<Invoice>> {
        Ok(self.state.invoices.get(&(tenant_id, invoice_id)).cloned())
    }

    async fn list_invoices(
        &mut self,
        tenant_id: i64,
        filter: &InvoiceFilter,
    ) -> ReconcileResult<Vec<Invoice>> {
        Ok(self
            .state
            .invoices
            .range(tenant_range(tenant_id))
            .map(|(_, invoice)| invoice)
            .filter(|invoice| filter.status.is_none_or(|status| invoice.status == status))
            .filter(|invoice| {
                filter
                    .amount_min
                    .as_ref()
                    .is_none_or(|min| &invoice.amount >= min)
            })
            .filter(|invoice| {
                filter
                    .amount_max
                    .as_ref()
                    .is_none_or(|max| &invoice.amount <= max)
            })
            .cloned()
            .collect())
    }

    async fn update_invoice_status(
        &mut self,
        tenant_id: i64,
        invoice_id: i64,
        status: InvoiceStatus,
    ) -> ReconcileResult<()> {
        match self.state.invoices.get_mut(&(tenant_id, invoice_id)) {
            Some(invoice) => {
                invoice.status = status;
                Ok(())
            }
            None => Err(ReconcileError::InvoiceNotFound(invoice_id)),
        }
    }

    async fn delete_invoice(&mut self, tenant_id: i64, invoice_id: i64) -> ReconcileResult<()> {
        match self.state.invoices.remove(&(tenant_id, invoice_id)) {
            Some(_) => Ok(()),
            None => Err(ReconcileError::InvoiceNotFound(invoice_id)),
        }
    }

    async fn insert_bank_transaction(
        &mut self,
        transaction: NewBankTransaction,
    ) -> ReconcileResult<BankTransaction> {
        let stored = BankTransaction {
            id: self.state.next_transaction_id(transaction.tenant_id),
            tenant_id: transaction.tenant_id,
            external_id: transaction.external_id,
            posted_at: transaction.posted_at,
            amount: transaction.amount,
            currency: transaction.currency,
            description: transaction.description,
            created_at: Utc::now().naive_utc(),
        };
        self.state
            .transactions
            .insert((stored.tenant_id, stored.id), stored.clone());
        Ok(stored)
    }

    async fn get_bank_transaction(
        &mut self,
        tenant_id: i64,
        transaction_id: i64,
    ) -> ReconcileResult<Option<BankTransaction>> {
        Ok(self
            .state
            .transactions
            .get(&(tenant_id, transaction_id))
            .cloned())
    }

    async fn list_bank_transactions(
        &mut self,
        tenant_id: i64,
    ) -> ReconcileResult<Vec<BankTransaction>> {
        Ok(self
            .state
            .transactions
            .range(tenant_range(tenant_id))
            .map(|(_, transaction)| transaction.clone())
            .collect())
    }

    async fn find_bank_transaction_by_external_id(
        &mut self,
        tenant_id: i64,
        external_id: &str,
    ) -> ReconcileResult<Option<BankTransaction>> {
        Ok(self
            .state
            .transactions
            .range(tenant_range(tenant_id))
            .map(|(_, transaction)| transaction)
            .find(|transaction| transaction.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert_match(&mut self, proposal: NewMatch) -> ReconcileResult<Match> {
        let duplicate = self
            .state
            .matches
            .range(tenant_range(proposal.tenant_id))
            .any(|(_, m)| {
                m.invoice_id == proposal.invoice_id
                    && m.bank_transaction_id == proposal.bank_transaction_id
            });
        if duplicate {
            return Err(ReconcileError::Conflict(format!(
                "match already exists for invoice {} and transaction {}",
                proposal.invoice_id, proposal.bank_transaction_id
            )));
        }

        let stored = Match {
            id: self.state.next_match_id(proposal.tenant_id),
            tenant_id: proposal.tenant_id,
            invoice_id: proposal.invoice_id,
            bank_transaction_id: proposal.bank_transaction_id,
            score: proposal.score,
            status: proposal.status,
            reasons: proposal.reasons,
            created_at: Utc::now().naive_utc(),
        };
        self.state
            .matches
            .insert((stored.tenant_id, stored.id), stored.clone());
        Ok(stored)
    }

    async fn get_match(
        &mut self,
        tenant_id: i64,
        match_id: i64,
    ) -> ReconcileResult<Option<Match>> {
        Ok(self.state.matches.get(&(tenant_id, match_id)).cloned())
    }

    async fn list_matches(
        &mut self,
        tenant_id: i64,
        invoice_id: Option<i64>,
        status: Option<MatchStatus>,
    ) -> ReconcileResult<Vec<Match>> {
        Ok(self
            .state
            .matches
            .range(tenant_range(tenant_id))
            .map(|(_, m)| m)
            .filter(|m| invoice_id.is_none_or(|id| m.invoice_id == id))
            .filter(|m| status.is_none_or(|s| m.status == s))
            .cloned()
            .collect())
    }

    async fn delete_proposed_matches(&mut self, tenant_id: i64) -> ReconcileResult<usize> {
        let doomed: Vec<(i64, i64)> = self
            .state
            .matches
            .range(tenant_range(tenant_id))
            .filter(|(_, m)| m.status == MatchStatus::Proposed)
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            self.state.matches.remove(key);
        }
        Ok(doomed.len())
    }

    async fn find_confirmed_match_for_invoice(
        &mut self,
        tenant_id: i64,
        invoice_id: i64,
    ) -> ReconcileResult<Option<Match>> {
        Ok(self
            .state
            .matches
            .range(tenant_range(tenant_id))
            .map(|(_, m)| m)
            .find(|m| m.invoice_id == invoice_id && m.status == MatchStatus::Confirmed)
            .cloned())
    }

    async fn update_match_status(
        &mut self,
        tenant_id: i64,
        match_id: i64,
        status: MatchStatus,
    ) -> ReconcileResult<()> {
        match self.state.matches.get_mut(&(tenant_id, match_id)) {
            Some(m) => {
                m.status = status;
                Ok(())
            }
            None => Err(ReconcileError::MatchNotFound(match_id)),
        }
    }

    async fn get_import_record(
        &mut self,
        tenant_id: i64,
        key: &str,
    ) -> ReconcileResult<Option<ImportIdempotencyRecord>> {
        Ok(self
            .state
            .import_records
            .get(&(tenant_id, key.to_string()))
            .cloned())
    }

    async fn insert_import_record(
        &mut self,
        record: NewImportRecord,
    ) -> ReconcileResult<ImportIdempotencyRecord> {
        let map_key = (record.tenant_id, record.key.clone());
        if self.state.import_records.contains_key(&map_key) {
            return Err(ReconcileError::Conflict(format!(
                "idempotency key already recorded: {}",
                record.key
            )));
        }

        let stored = ImportIdempotencyRecord {
            tenant_id: record.tenant_id,
            key: record.key,
            request_hash: record.request_hash,
            response_blob: record.response_blob,
            created_at: Utc::now().naive_utc(),
        };
        self.state.import_records.insert(map_key, stored.clone());
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> ReconcileResult<()> {
        let MemorySession { shared, state } = *self;
        *shared.write().unwrap() = state;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> ReconcileResult<()> {
        Ok(())
    }
}
