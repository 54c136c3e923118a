//! Deterministic scoring of invoice/transaction pairs
//!
//! Scoring is a fixed, explainable heuristic: exact amount equality, date
//! proximity within a window, and description similarity each contribute a
//! bounded number of points, and every contribution is tagged with a reason
//! code so a score can always be accounted for after the fact.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::types::{BankTransaction, Invoice};

/// Points for exact amount equality
pub const AMOUNT_EXACT_POINTS: f64 = 60.0;
/// Maximum points for date proximity; decays linearly across the window
pub const DATE_PROXIMITY_POINTS: f64 = 25.0;
/// Points for description similarity; scaled by token overlap
pub const TEXT_SIMILARITY_POINTS: f64 = 15.0;

/// Scoring outcome for one invoice/transaction pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub invoice_id: i64,
    pub bank_transaction_id: i64,
    /// Total score, rounded to 3 decimal places
    pub score: f64,
    /// Reason codes in contribution order: amount, then date, then text
    pub reasons: Vec<String>,
}

/// Score one invoice against one bank transaction
///
/// Returns `None` when the currencies differ; a currency mismatch
/// disqualifies the pair outright. Otherwise a candidate is always
/// returned, even at score zero, so callers interested only in positive
/// signal must filter for themselves.
pub fn score_match(
    invoice: &Invoice,
    transaction: &BankTransaction,
    window_days: u32,
) -> Option<Candidate> {
    if invoice.currency != transaction.currency {
        return None;
    }

    let mut score = 0.0;
    let mut reasons: Vec<String> = Vec::new();

    if invoice.amount == transaction.amount {
        score += AMOUNT_EXACT_POINTS;
        reasons.push("amount_exact".to_string());
    }

    if let Some(invoice_date) = invoice.invoice_date {
        let diff_days = day_distance(transaction.posted_at, invoice_date);
        if diff_days <= i64::from(window_days) {
            let window = f64::from(window_days.max(1));
            score += DATE_PROXIMITY_POINTS * (1.0 - diff_days as f64 / window);
            reasons.push(format!("date_within_{diff_days}_days"));
        }
    }

    let (text_bonus, text_reasons) =
        text_score(invoice.description.as_deref(), &transaction.description);
    if text_bonus > 0.0 {
        score += text_bonus;
        reasons.extend(text_reasons);
    }

    Some(Candidate {
        invoice_id: invoice.id,
        bank_transaction_id: transaction.id,
        score: round3(score),
        reasons,
    })
}

/// Whole days between a posted timestamp and an invoice date
///
/// Measured from the invoice date's midnight, floored, then made absolute,
/// so a transaction posted late the previous evening is one day away rather
/// than zero. Truncating toward zero would disagree for that case.
fn day_distance(posted_at: NaiveDateTime, invoice_date: NaiveDate) -> i64 {
    let delta = posted_at - invoice_date.and_time(NaiveTime::MIN);
    delta.num_seconds().div_euclid(86_400).abs()
}

/// Case-insensitive description similarity
///
/// Either side empty yields nothing. A substring relation in either
/// direction earns the full text points; otherwise tokens longer than
/// 3 characters are compared and the points scale with the overlap ratio
/// `|A∩B| / max(|A|, |B|)`.
fn text_score(
    invoice_description: Option<&str>,
    transaction_description: &str,
) -> (f64, Vec<String>) {
    let a = invoice_description.unwrap_or("").to_lowercase();
    let b = transaction_description.to_lowercase();
    if a.is_empty() || b.is_empty() {
        return (0.0, Vec::new());
    }

    if b.contains(&a) || a.contains(&b) {
        return (TEXT_SIMILARITY_POINTS, vec!["text_contains".to_string()]);
    }

    let a_tokens: HashSet<&str> = a
        .split_whitespace()
        .filter(|t| t.chars().count() > 3)
        .collect();
    let b_tokens: HashSet<&str> = b
        .split_whitespace()
        .filter(|t| t.chars().count() > 3)
        .collect();
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return (0.0, Vec::new());
    }

    let shared = a_tokens.intersection(&b_tokens).count();
    let overlap = shared as f64 / a_tokens.len().max(b_tokens.len()) as f64;
    if overlap > 0.0 {
        (
            TEXT_SIMILARITY_POINTS * overlap,
            vec!["text_overlap".to_string()],
        )
    } else {
        (0.0, Vec::new())
    }
}

fn round3(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvoiceStatus;
    use bigdecimal::BigDecimal;

    fn datetime(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn invoice(amount: &str, date: Option<&str>, description: Option<&str>) -> Invoice {
        Invoice {
            id: 1,
            tenant_id: 1,
            amount: amount.parse::<BigDecimal>().unwrap(),
            currency: "USD".to_string(),
            invoice_date: date.map(|d| d.parse().unwrap()),
            description: description.map(String::from),
            status: InvoiceStatus::Open,
            created_at: datetime("2025-01-01T00:00:00"),
        }
    }

    fn transaction(
        amount: &str,
        currency: &str,
        posted_at: &str,
        description: &str,
    ) -> BankTransaction {
        BankTransaction {
            id: 7,
            tenant_id: 1,
            external_id: None,
            posted_at: datetime(posted_at),
            amount: amount.parse::<BigDecimal>().unwrap(),
            currency: currency.to_string(),
            description: description.to_string(),
            created_at: datetime("2025-01-01T00:00:00"),
        }
    }

    #[test]
    fn test_currency_mismatch_disqualifies() {
        let inv = invoice("100", Some("2025-01-01"), Some("Acme January"));
        let tx = transaction("100", "EUR", "2025-01-01T00:00:00", "Acme January");
        assert!(score_match(&inv, &tx, 3).is_none());
    }

    #[test]
    fn test_exact_amount_scores_sixty() {
        let inv = invoice("100", None, None);
        let tx = transaction("100", "USD", "2025-06-15T12:00:00", "wire");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 60.0);
        assert_eq!(cand.reasons, vec!["amount_exact"]);
    }

    #[test]
    fn test_amount_equality_ignores_scale() {
        let inv = invoice("100.00", None, None);
        let tx = transaction("100", "USD", "2025-06-15T12:00:00", "wire");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 60.0);
    }

    #[test]
    fn test_same_day_earns_full_date_bonus() {
        let inv = invoice("100", Some("2025-01-01"), None);
        let tx = transaction("55", "USD", "2025-01-01T09:30:00", "wire");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 25.0);
        assert_eq!(cand.reasons, vec!["date_within_0_days"]);
    }

    #[test]
    fn test_date_bonus_decays_across_window() {
        let inv = invoice("100", Some("2025-01-01"), None);
        let one = transaction("55", "USD", "2025-01-02T00:00:00", "wire");
        let two = transaction("55", "USD", "2025-01-03T00:00:00", "wire");
        let s1 = score_match(&inv, &one, 3).unwrap().score;
        let s2 = score_match(&inv, &two, 3).unwrap().score;
        assert_eq!(s1, 16.667);
        assert_eq!(s2, 8.333);
        assert!(s1 > s2);
    }

    #[test]
    fn test_window_boundary_keeps_reason_at_zero_bonus() {
        let inv = invoice("100", Some("2025-01-01"), None);
        let tx = transaction("55", "USD", "2025-01-04T00:00:00", "wire");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 0.0);
        assert_eq!(cand.reasons, vec!["date_within_3_days"]);
    }

    #[test]
    fn test_date_outside_window_contributes_nothing() {
        let inv = invoice("100", Some("2025-01-01"), None);
        let tx = transaction("55", "USD", "2025-01-10T00:00:00", "wire");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 0.0);
        assert!(cand.reasons.is_empty());
    }

    #[test]
    fn test_evening_before_counts_as_one_day() {
        // Posted an hour before the invoice date's midnight: the floored
        // distance is one day, not zero.
        let inv = invoice("100", Some("2025-01-01"), None);
        let tx = transaction("55", "USD", "2024-12-31T23:00:00", "wire");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.reasons, vec!["date_within_1_days"]);
        assert_eq!(cand.score, 16.667);
    }

    #[test]
    fn test_substring_description_scores_full_points() {
        let inv = invoice("100", None, Some("Acme January"));
        let tx = transaction("55", "USD", "2025-06-15T12:00:00", "Acme January payment");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 15.0);
        assert_eq!(cand.reasons, vec!["text_contains"]);
    }

    #[test]
    fn test_token_overlap_scales_points() {
        let inv = invoice("100", None, Some("acme consulting retainer"));
        let tx = transaction("55", "USD", "2025-06-15T12:00:00", "acme retainer fee");
        // Shared tokens {acme, retainer} over max(3, 2) long-token set sizes.
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 10.0);
        assert_eq!(cand.reasons, vec!["text_overlap"]);
    }

    #[test]
    fn test_short_tokens_carry_no_weight() {
        let inv = invoice("100", None, Some("pay now ok"));
        let tx = transaction("55", "USD", "2025-06-15T12:00:00", "pay tms ref");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 0.0);
        assert!(cand.reasons.is_empty());
    }

    #[test]
    fn test_missing_description_scores_no_text() {
        let inv = invoice("100", None, None);
        let tx = transaction("55", "USD", "2025-06-15T12:00:00", "Acme January payment");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 0.0);
        assert!(cand.reasons.is_empty());
    }

    #[test]
    fn test_zero_score_candidate_is_still_returned() {
        let inv = invoice("100", None, None);
        let tx = transaction("55", "USD", "2025-06-15T12:00:00", "wire");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 0.0);
        assert!(cand.reasons.is_empty());
    }

    #[test]
    fn test_all_three_components_combine() {
        let inv = invoice("100", Some("2025-01-01"), Some("Acme January"));
        let tx = transaction("100", "USD", "2025-01-02T00:00:00", "Acme January payment");
        let cand = score_match(&inv, &tx, 3).unwrap();
        assert_eq!(cand.score, 91.667);
        assert_eq!(
            cand.reasons,
            vec!["amount_exact", "date_within_1_days", "text_contains"]
        );
    }
}
