//! Idempotent import example: replay, dedup, and payload-drift rejection

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;

use reconcile_core::utils::MemoryStore;
use reconcile_core::{AiConfig, Reconciler, TransactionInput};

fn stamp(s: &str) -> NaiveDateTime {
    s.parse().unwrap()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🏦 Reconcile Core - Idempotent Import Example\n");

    let store = MemoryStore::new();
    let mut reconciler = Reconciler::new(store, AiConfig::default());
    let tenant = reconciler.create_tenant("acme-corp").await?;

    let batch = [
        TransactionInput::new(
            stamp("2025-03-01T10:00:00"),
            BigDecimal::from(1200),
            "ACME retainer wire",
        )
        .with_external_id("stmt-001"),
        TransactionInput::new(
            stamp("2025-03-02T16:45:00"),
            BigDecimal::from(450),
            "Hosting invoice payment",
        )
        .with_external_id("stmt-002"),
    ];

    // 1. First delivery of the statement
    println!("💳 Importing statement under key '2025-03-statement'...");
    let first = reconciler
        .import_transactions(tenant.id, "2025-03-statement", &batch)
        .await?;
    println!(
        "  ✓ imported={} deduped={} ids={:?}",
        first.imported, first.deduped, first.transaction_ids
    );

    // 2. The feed retries the exact same request; the stored response is
    //    replayed and nothing is written twice
    println!("\n🔁 Replaying the identical request...");
    let replay = reconciler
        .import_transactions(tenant.id, "2025-03-statement", &batch)
        .await?;
    println!(
        "  ✓ imported={} deduped={} ids={:?} (identical to the first response)",
        replay.imported, replay.deduped, replay.transaction_ids
    );
    assert_eq!(first, replay);

    // 3. A later batch under a fresh key overlaps on external ids; the
    //    overlap is skipped, not re-imported
    println!("\n📄 Importing an overlapping batch under a new key...");
    let overlap = reconciler
        .import_transactions(
            tenant.id,
            "2025-03-statement-corrections",
            &[
                TransactionInput::new(
                    stamp("2025-03-02T16:45:00"),
                    BigDecimal::from(450),
                    "Hosting invoice payment",
                )
                .with_external_id("stmt-002"),
                TransactionInput::new(
                    stamp("2025-03-04T09:10:00"),
                    BigDecimal::from(75),
                    "Domain renewal",
                )
                .with_external_id("stmt-003"),
            ],
        )
        .await?;
    println!(
        "  ✓ imported={} deduped={} ids={:?}",
        overlap.imported, overlap.deduped, overlap.transaction_ids
    );

    // 4. Reusing the original key with a drifted payload is a conflict
    println!("\n⚠️  Reusing the original key with a different payload...");
    let drifted = [TransactionInput::new(
        stamp("2025-03-01T10:00:00"),
        BigDecimal::from(9999),
        "ACME retainer wire",
    )
    .with_external_id("stmt-001")];

    match reconciler
        .import_transactions(tenant.id, "2025-03-statement", &drifted)
        .await
    {
        Ok(_) => println!("  ❌ Unexpected: drifted payload was accepted"),
        Err(err) => println!("  ✓ Rejected as expected: {err}"),
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
