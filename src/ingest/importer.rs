//! Idempotent bulk import of bank transactions
//!
//! Each import request is guarded by a caller-supplied idempotency key and a
//! canonical hash of the payload. Retries with an identical body replay the
//! stored response without touching storage; the same key with a different
//! body is a conflict. Within a batch, items whose external id already
//! exists for the tenant are counted as duplicates and skipped.

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::traits::{ReconciliationStorage, StorageSession};
use crate::types::{
    ImportResult, NewBankTransaction, NewImportRecord, ReconcileError, ReconcileResult,
    TransactionInput, DEFAULT_CURRENCY,
};

/// Canonical hash of an import payload
///
/// Items are rewritten into objects with sorted keys, absent values as
/// nulls, the default currency applied, and amounts and timestamps coerced
/// to strings, then serialized compactly and digested with SHA-256. Two
/// payloads hash equally exactly when they are equivalent item for item.
pub fn canonical_hash(items: &[TransactionInput]) -> String {
    let canonical: Vec<Value> = items.iter().map(canonical_item).collect();
    let payload = Value::Array(canonical).to_string();
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}

fn canonical_item(item: &TransactionInput) -> Value {
    let mut object = serde_json::Map::new();
    object.insert(
        "amount".to_string(),
        item.amount
            .as_ref()
            .map_or(Value::Null, |a| Value::String(a.to_string())),
    );
    object.insert(
        "currency".to_string(),
        Value::String(
            item.currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        ),
    );
    object.insert(
        "description".to_string(),
        item.description
            .clone()
            .map_or(Value::Null, Value::String),
    );
    object.insert(
        "external_id".to_string(),
        item.external_id.clone().map_or(Value::Null, Value::String),
    );
    object.insert(
        "posted_at".to_string(),
        item.posted_at
            .map_or(Value::Null, |ts| Value::String(ts.to_string())),
    );
    Value::Object(object)
}

enum ImportOutcome {
    Fresh(ImportResult),
    Replayed(ImportResult),
}

/// Ingests bank transaction batches exactly once per (tenant, key, payload)
pub struct TransactionImporter<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> TransactionImporter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Import a batch of statement lines for a tenant
    ///
    /// The whole batch commits atomically together with its idempotency
    /// record; any failure rolls everything back. Replays of a previously
    /// committed (key, payload) return the stored result and write nothing.
    pub async fn import_batch(
        &self,
        tenant_id: i64,
        idempotency_key: &str,
        items: &[TransactionInput],
    ) -> ReconcileResult<ImportResult> {
        if idempotency_key.is_empty() {
            return Err(ReconcileError::InvalidArgument(
                "idempotency key must not be empty".to_string(),
            ));
        }

        let request_hash = canonical_hash(items);
        let mut session = self.storage.begin().await?;

        match Self::import_in(session.as_mut(), tenant_id, idempotency_key, &request_hash, items)
            .await
        {
            Ok(ImportOutcome::Fresh(result)) => {
                session.commit().await?;
                info!(
                    tenant_id,
                    idempotency_key,
                    imported = result.imported,
                    deduped = result.deduped,
                    "import batch committed"
                );
                Ok(result)
            }
            Ok(ImportOutcome::Replayed(result)) => {
                session.rollback().await?;
                debug!(tenant_id, idempotency_key, "replayed stored import result");
                Ok(result)
            }
            Err(e) => {
                session.rollback().await?;
                Err(e)
            }
        }
    }

    async fn import_in(
        session: &mut dyn StorageSession,
        tenant_id: i64,
        idempotency_key: &str,
        request_hash: &str,
        items: &[TransactionInput],
    ) -> ReconcileResult<ImportOutcome> {
        if let Some(record) = session.get_import_record(tenant_id, idempotency_key).await? {
            if record.request_hash != request_hash {
                return Err(ReconcileError::Conflict(
                    "idempotency key reused with different payload".to_string(),
                ));
            }
            let stored: ImportResult = serde_json::from_str(&record.response_blob)
                .map_err(|e| ReconcileError::Storage(format!("corrupt import record: {e}")))?;
            return Ok(ImportOutcome::Replayed(stored));
        }

        if items.is_empty() {
            return Err(ReconcileError::InvalidArgument(
                "items list must not be empty".to_string(),
            ));
        }

        let mut imported = 0usize;
        let mut duplicate_external_ids = 0usize;
        let mut transaction_ids: Vec<i64> = Vec::new();

        for item in items {
            let posted_at = item.posted_at.ok_or_else(|| missing_field("posted_at"))?;
            let amount = item.amount.clone().ok_or_else(|| missing_field("amount"))?;
            let description = item
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .ok_or_else(|| missing_field("description"))?;

            if let Some(external_id) = item.external_id.as_deref().filter(|id| !id.is_empty()) {
                let existing = session
                    .find_bank_transaction_by_external_id(tenant_id, external_id)
                    .await?;
                if existing.is_some() {
                    duplicate_external_ids += 1;
                    continue;
                }
            }

            let stored = session
                .insert_bank_transaction(NewBankTransaction {
                    tenant_id,
                    external_id: item.external_id.clone(),
                    posted_at,
                    amount,
                    currency: item
                        .currency
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                    description: description.to_string(),
                })
                .await?;
            transaction_ids.push(stored.id);
            imported += 1;
        }

        let result = ImportResult {
            imported,
            deduped: duplicate_external_ids,
            duplicate_external_ids,
            transaction_ids,
        };

        let response_blob = serde_json::to_string(&result)
            .map_err(|e| ReconcileError::Storage(format!("serialize import result: {e}")))?;
        session
            .insert_import_record(NewImportRecord {
                tenant_id,
                key: idempotency_key.to_string(),
                request_hash: request_hash.to_string(),
                response_blob,
            })
            .await?;

        Ok(ImportOutcome::Fresh(result))
    }
}

fn missing_field(name: &str) -> ReconcileError {
    ReconcileError::InvalidArgument(format!("missing required field: {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn item(posted_at: &str, amount: &str, description: &str) -> TransactionInput {
        TransactionInput::new(
            posted_at.parse().unwrap(),
            amount.parse::<BigDecimal>().unwrap(),
            description,
        )
    }

    #[test]
    fn test_hash_is_stable_across_calls() {
        let items = vec![item("2025-01-02T00:00:00", "100", "Acme payment")];
        assert_eq!(canonical_hash(&items), canonical_hash(&items));
    }

    #[test]
    fn test_hash_detects_payload_drift() {
        let a = vec![item("2025-01-02T00:00:00", "100", "Acme payment")];
        let b = vec![item("2025-01-02T00:00:00", "101", "Acme payment")];
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        let first = item("2025-01-02T00:00:00", "100", "one");
        let second = item("2025-01-03T00:00:00", "200", "two");
        let forward = canonical_hash(&[first.clone(), second.clone()]);
        let reversed = canonical_hash(&[second, first]);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn test_hash_applies_default_currency() {
        let bare = vec![item("2025-01-02T00:00:00", "100", "wire")];
        let explicit = vec![item("2025-01-02T00:00:00", "100", "wire").with_currency("USD")];
        assert_eq!(canonical_hash(&bare), canonical_hash(&explicit));
    }

    #[test]
    fn test_hash_of_empty_batch_is_the_empty_array_digest() {
        // SHA-256 of the two-byte string "[]".
        assert_eq!(
            canonical_hash(&[]),
            "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945"
        );
    }

    #[test]
    fn test_canonical_item_sorts_keys_and_coerces() {
        let rewritten = canonical_item(
            &item("2025-01-02T00:00:00", "100.50", "wire").with_external_id("bx-1"),
        );
        assert_eq!(
            rewritten.to_string(),
            r#"{"amount":"100.50","currency":"USD","description":"wire","external_id":"bx-1","posted_at":"2025-01-02 00:00:00"}"#
        );
    }
}
