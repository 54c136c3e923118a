//! Core types and data structures for the reconciliation system

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Currency assigned to invoices and transactions that do not carry one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Lifecycle states of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Awaiting payment; eligible for reconciliation
    Open,
    /// A bank transaction has been confirmed against this invoice
    Matched,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Matched => write!(f, "matched"),
        }
    }
}

/// Lifecycle states of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Produced by a reconciliation run; replaced wholesale by the next run
    Proposed,
    /// Approved by an operator; terminal
    Confirmed,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposed => write!(f, "proposed"),
            Self::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// Isolation boundary: every other entity is owned by exactly one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Storage-generated identifier
    pub id: i64,
    /// Display name, unique across the store
    pub name: String,
    /// When the tenant was created
    pub created_at: NaiveDateTime,
}

/// An accounts-receivable invoice awaiting payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Storage-generated identifier, scoped to the tenant
    pub id: i64,
    /// Owning tenant
    pub tenant_id: i64,
    /// Invoiced amount; always positive
    pub amount: BigDecimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Issue date, when known; drives the date-proximity bonus
    pub invoice_date: Option<NaiveDate>,
    /// Free-text description, when known; drives the text-similarity bonus
    pub description: Option<String>,
    /// Current lifecycle state
    pub status: InvoiceStatus,
    /// When the invoice was created
    pub created_at: NaiveDateTime,
}

/// A bank transaction imported from a statement feed; immutable once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Storage-generated identifier, scoped to the tenant
    pub id: i64,
    /// Owning tenant
    pub tenant_id: i64,
    /// Bank-side identifier; a natural dedup key when non-empty
    pub external_id: Option<String>,
    /// When the bank posted the transaction
    pub posted_at: NaiveDateTime,
    /// Transaction amount
    pub amount: BigDecimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Statement line description
    pub description: String,
    /// When the transaction was imported
    pub created_at: NaiveDateTime,
}

/// A scored link between one invoice and one bank transaction
///
/// At most one match may ever exist per (tenant, invoice, transaction)
/// triple, and at most one match per invoice may be confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Storage-generated identifier, scoped to the tenant
    pub id: i64,
    /// Owning tenant
    pub tenant_id: i64,
    /// The invoice side of the pair
    pub invoice_id: i64,
    /// The bank transaction side of the pair
    pub bank_transaction_id: i64,
    /// Heuristic score, rounded to 3 decimal places
    pub score: f64,
    /// Current lifecycle state
    pub status: MatchStatus,
    /// Reason codes explaining the score, in contribution order
    pub reasons: Vec<String>,
    /// When the match was proposed
    pub created_at: NaiveDateTime,
}

/// Replay ledger entry for one bulk import request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportIdempotencyRecord {
    /// Owning tenant
    pub tenant_id: i64,
    /// Caller-supplied idempotency key, unique per tenant
    pub key: String,
    /// Canonical hash of the submitted batch
    pub request_hash: String,
    /// Serialized [`ImportResult`] returned to the original request
    pub response_blob: String,
    /// When the record was written
    pub created_at: NaiveDateTime,
}

/// Insert payload for an invoice; stored invoices always start [`InvoiceStatus::Open`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub tenant_id: i64,
    pub amount: BigDecimal,
    pub currency: String,
    pub invoice_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl NewInvoice {
    /// Create a payload in the default currency with no date or description
    pub fn new(tenant_id: i64, amount: BigDecimal) -> Self {
        Self {
            tenant_id,
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            invoice_date: None,
            description: None,
        }
    }
}

/// Insert payload for a bank transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBankTransaction {
    pub tenant_id: i64,
    pub external_id: Option<String>,
    pub posted_at: NaiveDateTime,
    pub amount: BigDecimal,
    pub currency: String,
    pub description: String,
}

/// Insert payload for a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMatch {
    pub tenant_id: i64,
    pub invoice_id: i64,
    pub bank_transaction_id: i64,
    pub score: f64,
    pub status: MatchStatus,
    pub reasons: Vec<String>,
}

/// Insert payload for an idempotency record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImportRecord {
    pub tenant_id: i64,
    pub key: String,
    pub request_hash: String,
    pub response_blob: String,
}

/// One statement line submitted to the bulk importer
///
/// Every field is optional so that incomplete submissions are representable;
/// the importer rejects items missing `posted_at`, `amount`, or `description`
/// with an error naming the field. A missing `currency` defaults to `"USD"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub external_id: Option<String>,
    pub posted_at: Option<NaiveDateTime>,
    pub amount: Option<BigDecimal>,
    pub currency: Option<String>,
    pub description: Option<String>,
}

impl TransactionInput {
    /// Create an input carrying the three required fields
    pub fn new(posted_at: NaiveDateTime, amount: BigDecimal, description: &str) -> Self {
        Self {
            external_id: None,
            posted_at: Some(posted_at),
            amount: Some(amount),
            currency: None,
            description: Some(description.to_string()),
        }
    }

    /// Set the bank-side external id
    pub fn with_external_id(mut self, external_id: &str) -> Self {
        self.external_id = Some(external_id.to_string());
        self
    }

    /// Set the currency code
    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = Some(currency.to_string());
        self
    }
}

/// Outcome of one bulk import request
///
/// `deduped` always mirrors `duplicate_external_ids`; both names are kept
/// because downstream consumers read either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Number of transactions inserted by this request
    pub imported: usize,
    /// Number of items skipped because their external id already existed
    pub deduped: usize,
    /// Same count under its long name
    pub duplicate_external_ids: usize,
    /// Generated ids of the inserted transactions, in input order
    pub transaction_ids: Vec<i64>,
}

/// Filter for invoice listings; empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceFilter {
    /// Restrict to one lifecycle state
    pub status: Option<InvoiceStatus>,
    /// Inclusive lower bound on the amount
    pub amount_min: Option<BigDecimal>,
    /// Inclusive upper bound on the amount
    pub amount_max: Option<BigDecimal>,
}

impl InvoiceFilter {
    /// Filter that keeps only open invoices
    pub fn open() -> Self {
        Self {
            status: Some(InvoiceStatus::Open),
            ..Self::default()
        }
    }
}

/// Confidence band derived from a match score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// Band boundaries: 70 and above is high, 40 and above is medium
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Everything an explainer may cite about one invoice/transaction pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainContext {
    pub invoice_amount: BigDecimal,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_description: Option<String>,
    pub transaction_amount: BigDecimal,
    pub transaction_posted_at: NaiveDateTime,
    pub transaction_description: String,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Human-readable account of why a pair scores the way it does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub explanation: String,
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Tenant not found: {0}")]
    TenantNotFound(i64),
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(i64),
    #[error("Bank transaction not found: {0}")]
    TransactionNotFound(i64),
    #[error("Match not found: {0}")]
    MatchNotFound(i64),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
