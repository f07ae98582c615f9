//! Blocking predicates used to shortlist retrieval candidates.
//!
//! The store layer is responsible for the coarse `(tenant, vendor)`
//! pre-filter (and for `cap`); this module applies the finer blocking
//! rules and truncates to `cap`, so the rules stay testable without a
//! database.

use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use sieve_core::model::Invoice;

/// Whether `candidate` matches any blocking predicate against `base`.
/// Both invoices are assumed to already share `(tenant_id, vendor_id)`
/// and have distinct `invoice_id`s.
pub fn is_candidate(base: &Invoice, candidate: &Invoice) -> bool {
    totals_agree_same_month(base, candidate)
        || same_non_empty_po(base, candidate)
        || same_invnum(base, candidate)
        || same_remit_hash(base, candidate)
}

fn totals_agree_same_month(base: &Invoice, candidate: &Invoice) -> bool {
    let cents_a = (base.total.to_f64().unwrap_or(0.0) * 100.0).round() as i64;
    let cents_b = (candidate.total.to_f64().unwrap_or(0.0) * 100.0).round() as i64;
    cents_a == cents_b
        && base.invoice_date.year() == candidate.invoice_date.year()
        && base.invoice_date.month() == candidate.invoice_date.month()
}

fn same_non_empty_po(base: &Invoice, candidate: &Invoice) -> bool {
    matches!(
        (base.po_number.as_deref(), candidate.po_number.as_deref()),
        (Some(a), Some(b)) if !a.is_empty() && a == b
    )
}

fn same_invnum(base: &Invoice, candidate: &Invoice) -> bool {
    base.invoice_number_norm == candidate.invoice_number_norm
}

fn same_remit_hash(base: &Invoice, candidate: &Invoice) -> bool {
    matches!(
        (&base.remit_account_hash, &candidate.remit_account_hash),
        (Some(a), Some(b)) if a == b
    )
}

/// Filter `pool` down to the candidates blocking-matched against `base`,
/// truncated to `cap`.
pub fn filter_candidates(base: &Invoice, pool: &[Invoice], cap: u32) -> Vec<Invoice> {
    pool.iter()
        .filter(|candidate| candidate.invoice_id != base.invoice_id && is_candidate(base, candidate))
        .take(cap as usize)
        .cloned()
        .collect()
}
