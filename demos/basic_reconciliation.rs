//! Basic reconciliation walkthrough

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};

use reconcile_core::utils::MemoryStore;
use reconcile_core::{
    AiConfig, NewInvoice, Reconciler, TransactionInput, DEFAULT_MAX_CANDIDATES,
    DEFAULT_WINDOW_DAYS,
};

fn stamp(s: &str) -> NaiveDateTime {
    s.parse().unwrap()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🏦 Reconcile Core - Basic Reconciliation Example\n");

    let store = MemoryStore::new();
    let mut reconciler = Reconciler::new(store, AiConfig::from_env());

    // 1. Set up a tenant with two open invoices
    println!("🏢 Setting up tenant and invoices...");
    let tenant = reconciler.create_tenant("acme-corp").await?;
    println!("  ✓ Created tenant: {} (id {})", tenant.name, tenant.id);

    let retainer = reconciler
        .create_invoice(NewInvoice {
            tenant_id: tenant.id,
            amount: BigDecimal::from(1200),
            currency: "USD".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            description: Some("March retainer".to_string()),
        })
        .await?;
    println!(
        "  ✓ Invoice {}: {} {} - {}",
        retainer.id,
        retainer.amount,
        retainer.currency,
        retainer.description.as_deref().unwrap_or("-")
    );

    let hosting = reconciler
        .create_invoice(NewInvoice {
            tenant_id: tenant.id,
            amount: BigDecimal::from(450),
            currency: "USD".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2025, 3, 5),
            description: Some("Hosting March".to_string()),
        })
        .await?;
    println!(
        "  ✓ Invoice {}: {} {} - {}",
        hosting.id,
        hosting.amount,
        hosting.currency,
        hosting.description.as_deref().unwrap_or("-")
    );

    // 2. Import a bank statement batch
    println!("\n💳 Importing bank statement...");
    let result = reconciler
        .import_transactions(
            tenant.id,
            "2025-03-statement",
            &[
                TransactionInput::new(
                    stamp("2025-03-03T09:30:00"),
                    BigDecimal::from(1200),
                    "ACME march retainer wire",
                )
                .with_external_id("stmt-001"),
                TransactionInput::new(
                    stamp("2025-03-05T14:00:00"),
                    BigDecimal::from(450),
                    "Hosting March ACME",
                )
                .with_external_id("stmt-002"),
                TransactionInput::new(
                    stamp("2025-03-07T11:15:00"),
                    "99.95".parse::<BigDecimal>().unwrap(),
                    "Coffee supplies",
                )
                .with_external_id("stmt-003"),
            ],
        )
        .await?;
    println!(
        "  ✓ Imported {} transactions ({} deduplicated)",
        result.imported, result.deduped
    );

    // 3. Run reconciliation and inspect the ranked proposals
    println!("\n🔁 Running reconciliation (window 3 days, top 2 per invoice)...");
    let proposals = reconciler.reconcile(tenant.id, 3, 2).await?;
    for proposal in &proposals {
        println!(
            "  proposal {}: invoice {} ↔ transaction {} | score {:.3} | {}",
            proposal.id,
            proposal.invoice_id,
            proposal.bank_transaction_id,
            proposal.score,
            proposal.reasons.join(", ")
        );
    }

    // 4. Confirm the strongest proposal
    let best = proposals
        .iter()
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap())
        .expect("reconciliation produced no proposals");

    println!("\n✅ Confirming match {} (score {:.3})...", best.id, best.score);
    let confirmed = reconciler.confirm_match(tenant.id, best.id).await?;
    println!("  ✓ Match {} is now {}", confirmed.id, confirmed.status);

    let matched_invoice = reconciler.get_invoice(tenant.id, confirmed.invoice_id).await?;
    println!(
        "  ✓ Invoice {} is now {}",
        matched_invoice.id, matched_invoice.status
    );

    // 5. Explain a proposal (uses the AI backend when AI_API_KEY is set,
    //    otherwise a deterministic fallback)
    let open_proposal = proposals
        .iter()
        .find(|m| m.invoice_id == retainer.id)
        .expect("no proposal for the retainer invoice");

    println!("\n🤖 Explaining the retainer proposal...");
    let explanation = reconciler
        .explain(
            tenant.id,
            open_proposal.invoice_id,
            open_proposal.bank_transaction_id,
        )
        .await?;
    println!("  {}", explanation.explanation);

    // 6. Re-run reconciliation with the engine defaults: the confirmed match
    //    survives, and only the still-open invoice gets fresh proposals
    println!("\n🔁 Re-running reconciliation...");
    let rerun = reconciler
        .reconcile(tenant.id, DEFAULT_WINDOW_DAYS, DEFAULT_MAX_CANDIDATES)
        .await?;
    println!("  ✓ {} proposals regenerated", rerun.len());
    for proposal in &rerun {
        println!(
            "  proposal {}: invoice {} ↔ transaction {} | score {:.3}",
            proposal.id, proposal.invoice_id, proposal.bank_transaction_id, proposal.score
        );
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
