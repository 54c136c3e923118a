//! Proposed-to-confirmed match lifecycle

use tracing::info;

use crate::traits::{ReconciliationStorage, StorageSession};
use crate::types::{InvoiceStatus, Match, MatchStatus, ReconcileError, ReconcileResult};

/// Transitions matches out of the proposed state
///
/// Confirmation is the only transition: a proposed match becomes confirmed,
/// its invoice becomes matched, and both writes land atomically. At most one
/// confirmed match may exist per invoice.
pub struct MatchConfirmer<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> MatchConfirmer<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Confirm a proposed match and mark its invoice matched
    ///
    /// Fails with `MatchNotFound` if the match does not exist for the
    /// tenant, `InvalidState` if it is not currently proposed, and
    /// `Conflict` if a different match is already confirmed for the same
    /// invoice. Every failure path rolls back.
    pub async fn confirm(&self, tenant_id: i64, match_id: i64) -> ReconcileResult<Match> {
        let mut session = self.storage.begin().await?;
        match Self::confirm_in(session.as_mut(), tenant_id, match_id).await {
            Ok(confirmed) => {
                session.commit().await?;
                info!(
                    tenant_id,
                    match_id,
                    invoice_id = confirmed.invoice_id,
                    "match confirmed"
                );
                Ok(confirmed)
            }
            Err(e) => {
                session.rollback().await?;
                Err(e)
            }
        }
    }

    async fn confirm_in(
        session: &mut dyn StorageSession,
        tenant_id: i64,
        match_id: i64,
    ) -> ReconcileResult<Match> {
        let mut target = session
            .get_match(tenant_id, match_id)
            .await?
            .ok_or(ReconcileError::MatchNotFound(match_id))?;

        if target.status != MatchStatus::Proposed {
            return Err(ReconcileError::InvalidState(format!(
                "match is not in proposed state (current={})",
                target.status
            )));
        }

        if let Some(existing) = session
            .find_confirmed_match_for_invoice(tenant_id, target.invoice_id)
            .await?
        {
            if existing.id != match_id {
                return Err(ReconcileError::Conflict(
                    "invoice already has a confirmed match".to_string(),
                ));
            }
        }

        session
            .update_match_status(tenant_id, match_id, MatchStatus::Confirmed)
            .await?;
        session
            .update_invoice_status(tenant_id, target.invoice_id, InvoiceStatus::Matched)
            .await?;

        target.status = MatchStatus::Confirmed;
        Ok(target)
    }
}
