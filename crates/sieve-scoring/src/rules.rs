//! Deterministic rule engine, evaluated against the top-ranked candidate.

use rust_decimal::prelude::ToPrimitive;
use sieve_core::model::{FeatureVector, Invoice};

use crate::reasons::{BANK_CHANGE, EXACT_INVNUM, PDF_NEAR_DUP, SAME_PO_NEAR_TOTAL};

/// Fraction of `|total_a|` within which two near-identical totals on the
/// same PO are still considered the same invoice.
const SAME_PO_TOTAL_TOLERANCE: f64 = 0.005;
const SAME_PO_MAX_DAYS: f64 = 30.0;
const SHINGLE_JACCARD_THRESHOLD: f64 = 0.9;

/// Evaluate the rule set for one `(base, candidate)` pair. Order is
/// preserved in the order rules are listed; the caller is responsible for
/// de-duplicating across candidates.
pub fn evaluate(
    base: &Invoice,
    candidate: &Invoice,
    features: &FeatureVector,
    bank_change: bool,
    shingle_jaccard: Option<f64>,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if !base.invoice_number_norm.is_empty() && base.invoice_number_norm == candidate.invoice_number_norm {
        reasons.push(EXACT_INVNUM.to_string());
    }

    let same_po = matches!(
        (base.po_number.as_deref(), candidate.po_number.as_deref()),
        (Some(a), Some(b)) if a == b
    );
    if same_po {
        let total_a = base.total.to_f64().unwrap_or(0.0);
        let total_b = candidate.total.to_f64().unwrap_or(0.0);
        let tolerance = SAME_PO_TOTAL_TOLERANCE * total_a.abs().max(1.0);
        if (total_a - total_b).abs() <= tolerance && features.days_diff <= SAME_PO_MAX_DAYS {
            reasons.push(SAME_PO_NEAR_TOTAL.to_string());
        }
    }

    let pdf_match = match (&base.pdf_hash, &candidate.pdf_hash) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    let shingle_match = shingle_jaccard.is_some_and(|j| j >= SHINGLE_JACCARD_THRESHOLD);
    if pdf_match || shingle_match {
        reasons.push(PDF_NEAR_DUP.to_string());
    }

    if bank_change {
        reasons.push(BANK_CHANGE.to_string());
    }

    reasons
}
