//! Tenant-wide reconciliation runs
//!
//! A run replaces the tenant's entire proposed-match set: prior proposals
//! are purged, every open invoice is scored against every bank transaction,
//! and the top candidates per invoice are persisted, all within a single
//! storage session.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use crate::reconciliation::scoring::{score_match, Candidate};
use crate::traits::{ReconciliationStorage, StorageSession};
use crate::types::{InvoiceFilter, Match, MatchStatus, NewMatch, ReconcileError, ReconcileResult};

/// Date window applied when a caller does not choose one
pub const DEFAULT_WINDOW_DAYS: u32 = 3;
/// Proposal cap per invoice applied when a caller does not choose one
pub const DEFAULT_MAX_CANDIDATES: usize = 3;

/// Generates, ranks, and persists match proposals for a tenant
pub struct ReconciliationEngine<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> ReconciliationEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Replace the tenant's proposed matches with a freshly scored set
    ///
    /// Scores every open invoice against every bank transaction, keeps
    /// candidates with a strictly positive score, ranks them per invoice by
    /// descending score with ascending transaction id as the tie-break, and
    /// persists the top `max_candidates_per_invoice` of each as proposed
    /// matches. The purge and all inserts commit atomically; any failure
    /// rolls the whole run back. Confirmed matches are never touched.
    ///
    /// Returns the created matches in invoice-then-rank order.
    pub async fn reconcile(
        &self,
        tenant_id: i64,
        window_days: u32,
        max_candidates_per_invoice: usize,
    ) -> ReconcileResult<Vec<Match>> {
        if window_days == 0 {
            return Err(ReconcileError::InvalidArgument(
                "window_days must be > 0".to_string(),
            ));
        }
        if max_candidates_per_invoice == 0 {
            return Err(ReconcileError::InvalidArgument(
                "max_candidates_per_invoice must be > 0".to_string(),
            ));
        }

        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            tenant_id,
            window_days,
            max_candidates_per_invoice,
            "starting reconciliation run"
        );

        let mut session = self.storage.begin().await?;
        match Self::reconcile_in(
            session.as_mut(),
            tenant_id,
            window_days,
            max_candidates_per_invoice,
        )
        .await
        {
            Ok(created) => {
                session.commit().await?;
                info!(%run_id, tenant_id, proposed = created.len(), "reconciliation run committed");
                Ok(created)
            }
            Err(e) => {
                session.rollback().await?;
                Err(e)
            }
        }
    }

    async fn reconcile_in(
        session: &mut dyn StorageSession,
        tenant_id: i64,
        window_days: u32,
        max_candidates_per_invoice: usize,
    ) -> ReconcileResult<Vec<Match>> {
        let purged = session.delete_proposed_matches(tenant_id).await?;
        debug!(tenant_id, purged, "cleared prior proposals");

        let invoices = session
            .list_invoices(tenant_id, &InvoiceFilter::open())
            .await?;
        let transactions = session.list_bank_transactions(tenant_id).await?;

        let mut created: Vec<Match> = Vec::new();
        let mut seen_pairs: HashSet<(i64, i64)> = HashSet::new();

        for invoice in &invoices {
            let mut candidates: Vec<Candidate> = transactions
                .iter()
                .filter_map(|tx| score_match(invoice, tx, window_days))
                .filter(|c| c.score > 0.0)
                .collect();

            candidates.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(Ordering::Equal)
                    .then(a.bank_transaction_id.cmp(&b.bank_transaction_id))
            });

            for candidate in candidates.into_iter().take(max_candidates_per_invoice) {
                // Global pair dedup across the run.
                if !seen_pairs.insert((candidate.invoice_id, candidate.bank_transaction_id)) {
                    continue;
                }

                let proposal = session
                    .insert_match(NewMatch {
                        tenant_id,
                        invoice_id: candidate.invoice_id,
                        bank_transaction_id: candidate.bank_transaction_id,
                        score: candidate.score,
                        status: MatchStatus::Proposed,
                        reasons: candidate.reasons,
                    })
                    .await?;
                created.push(proposal);
            }
        }

        Ok(created)
    }
}
