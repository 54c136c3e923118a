//! # Reconcile Core
//!
//! An accounts-receivable reconciliation library matching invoices against
//! imported bank transactions for multiple isolated tenants.
//!
//! ## Features
//!
//! - **Deterministic scoring**: explainable amount/date/text heuristic with
//!   reason codes for every point awarded
//! - **Proposal engine**: tenant-wide ranked match proposals with atomic
//!   replace semantics across runs
//! - **Match lifecycle**: proposed-to-confirmed transitions enforcing one
//!   confirmed match per invoice, atomic with the invoice status flip
//! - **Idempotent imports**: replay-safe bulk ingestion keyed by client
//!   idempotency tokens with payload-drift detection
//! - **Explanations**: AI-backed narratives with a deterministic fallback
//!   that never fails
//! - **Storage abstraction**: session-based storage trait with a bundled
//!   in-memory implementation
//!
//! ## Quick Start
//!
//! ```rust
//! use reconcile_core::utils::MemoryStore;
//! use reconcile_core::{AiConfig, NewInvoice, Reconciler, TransactionInput};
//! use bigdecimal::BigDecimal;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), reconcile_core::ReconcileError> {
//! let mut recon = Reconciler::new(MemoryStore::new(), AiConfig::default());
//!
//! let tenant = recon.create_tenant("acme").await?;
//! recon
//!     .create_invoice(NewInvoice {
//!         tenant_id: tenant.id,
//!         amount: BigDecimal::from(250),
//!         currency: "USD".to_string(),
//!         invoice_date: Some("2025-03-01".parse().unwrap()),
//!         description: Some("March retainer".to_string()),
//!     })
//!     .await?;
//!
//! recon
//!     .import_transactions(
//!         tenant.id,
//!         "batch-1",
//!         &[TransactionInput::new(
//!             "2025-03-02T09:30:00".parse().unwrap(),
//!             BigDecimal::from(250),
//!             "ACME retainer wire",
//!         )],
//!     )
//!     .await?;
//!
//! let proposals = recon.reconcile(tenant.id, 3, 3).await?;
//! assert_eq!(proposals.len(), 1);
//! recon.confirm_match(tenant.id, proposals[0].id).await?;
//! # Ok(())
//! # }
//! ```

pub mod ingest;
pub mod invoices;
pub mod reconciliation;
pub mod tenants;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use ingest::*;
pub use invoices::*;
pub use reconciliation::*;
pub use tenants::*;
pub use traits::*;
pub use types::*;
