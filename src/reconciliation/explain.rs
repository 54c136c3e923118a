//! Match explanations
//!
//! An explanation is assembled in two steps: a deterministic scoring context
//! for the pair, then a narrative from the configured [`AiExplainer`]. The
//! explainer is allowed to fail for any reason; callers always receive text,
//! falling back to a summary composed from the reason codes alone.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::reconciliation::engine::DEFAULT_WINDOW_DAYS;
use crate::reconciliation::scoring::score_match;
use crate::traits::{AiConfig, AiExplainer, ReconciliationStorage, StorageSession};
use crate::types::{
    ConfidenceBand, ExplainContext, Explanation, ReconcileError, ReconcileResult,
};

/// Placeholder AI client
///
/// Stands in for a real model integration: it refuses to run without an API
/// key and otherwise produces a fixed-shape narrative from the context. The
/// refusal path is what exercises the fallback contract end to end.
pub struct StubAiExplainer {
    api_key: Option<String>,
}

impl StubAiExplainer {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl AiExplainer for StubAiExplainer {
    async fn explain(&self, context: &ExplainContext) -> ReconcileResult<String> {
        if self.api_key.is_none() {
            return Err(ReconcileError::InvalidState(
                "missing AI API key".to_string(),
            ));
        }

        let confidence = ConfidenceBand::from_score(context.score);
        let amounts = if context.reasons.iter().any(|r| r == "amount_exact") {
            "match"
        } else {
            "do not exactly match"
        };
        Ok(format!(
            "This match looks {confidence} confidence: the amounts {amounts}, \
             the dates are close, and the descriptions share overlapping cues. \
             Overall score {score:.1} based on deterministic heuristics.",
            score = context.score
        ))
    }
}

/// Compose an explanation strictly from the score and reason codes
pub fn fallback_explanation(context: &ExplainContext) -> String {
    let mut parts: Vec<String> = Vec::new();

    if context.reasons.iter().any(|r| r == "amount_exact") {
        parts.push("Amount is an exact match.".to_string());
    } else {
        parts.push("Amount does not exactly match.".to_string());
    }

    if let Some(date_reason) = context.reasons.iter().find(|r| r.starts_with("date_within_")) {
        parts.push(format!(
            "Transaction date is close to the invoice date ({}).",
            date_reason.replace('_', " ")
        ));
    }

    if context
        .reasons
        .iter()
        .any(|r| r == "text_contains" || r == "text_overlap")
    {
        parts.push("Descriptions contain overlapping keywords.".to_string());
    }

    parts.push(format!("Deterministic score: {:.1}.", context.score));
    parts.join(" ")
}

/// Builds scoring contexts and produces explanations for them
pub struct ExplainService<S: ReconciliationStorage> {
    storage: S,
    explainer: Arc<dyn AiExplainer>,
}

impl<S: ReconciliationStorage> ExplainService<S> {
    /// Create a service backed by the stub explainer for `config`
    pub fn new(storage: S, config: &AiConfig) -> Self {
        Self {
            storage,
            explainer: Arc::new(StubAiExplainer::new(config)),
        }
    }

    /// Create a service with a caller-provided explainer
    pub fn with_explainer(storage: S, explainer: Arc<dyn AiExplainer>) -> Self {
        Self { storage, explainer }
    }

    /// Assemble the deterministic scoring context for one pair
    ///
    /// Fails with `InvoiceNotFound` or `TransactionNotFound` when either
    /// side is absent for the tenant. A currency mismatch yields a context
    /// with score 0 and no reasons rather than an error.
    pub async fn build_context(
        &self,
        tenant_id: i64,
        invoice_id: i64,
        transaction_id: i64,
        window_days: u32,
    ) -> ReconcileResult<ExplainContext> {
        let mut session = self.storage.begin().await?;
        let context = Self::build_context_in(
            session.as_mut(),
            tenant_id,
            invoice_id,
            transaction_id,
            window_days,
        )
        .await;
        session.rollback().await?;
        context
    }

    async fn build_context_in(
        session: &mut dyn StorageSession,
        tenant_id: i64,
        invoice_id: i64,
        transaction_id: i64,
        window_days: u32,
    ) -> ReconcileResult<ExplainContext> {
        let invoice = session
            .get_invoice(tenant_id, invoice_id)
            .await?
            .ok_or(ReconcileError::InvoiceNotFound(invoice_id))?;
        let transaction = session
            .get_bank_transaction(tenant_id, transaction_id)
            .await?
            .ok_or(ReconcileError::TransactionNotFound(transaction_id))?;

        let (score, reasons) = match score_match(&invoice, &transaction, window_days) {
            Some(candidate) => (candidate.score, candidate.reasons),
            None => (0.0, Vec::new()),
        };

        Ok(ExplainContext {
            invoice_amount: invoice.amount,
            invoice_date: invoice.invoice_date,
            invoice_description: invoice.description,
            transaction_amount: transaction.amount,
            transaction_posted_at: transaction.posted_at,
            transaction_description: transaction.description,
            score,
            reasons,
        })
    }

    /// Explain one invoice/transaction pair
    ///
    /// Explainer failures never surface; the deterministic fallback text is
    /// returned in their place.
    pub async fn explain(
        &self,
        tenant_id: i64,
        invoice_id: i64,
        transaction_id: i64,
    ) -> ReconcileResult<Explanation> {
        let context = self
            .build_context(tenant_id, invoice_id, transaction_id, DEFAULT_WINDOW_DAYS)
            .await?;

        let explanation = match self.explainer.explain(&context).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    error = %e,
                    tenant_id,
                    invoice_id,
                    transaction_id,
                    "explainer unavailable, composing fallback"
                );
                fallback_explanation(&context)
            }
        };

        Ok(Explanation { explanation })
    }
}
