//! Pairwise feature extraction between a base invoice and a retrieval
//! candidate.

use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use sieve_core::model::{FeatureVector, Invoice, LineItem};
use sieve_core::normalize::desc_norm;

use crate::assignment::min_cost_assignment;

const DESC_WEIGHT: f64 = 0.7;
const UNIT_PRICE_WEIGHT: f64 = 0.2;
const QTY_WEIGHT: f64 = 0.1;
const TERM_CAP: f64 = 5.0;

/// Compute the full 13-feature vector for a `(base, candidate)` pair.
pub fn extract(
    base: &Invoice,
    base_lines: &[LineItem],
    candidate: &Invoice,
    candidate_lines: &[LineItem],
) -> FeatureVector {
    let total_a = base.total.to_f64().unwrap_or(0.0);
    let total_b = candidate.total.to_f64().unwrap_or(0.0);
    let tax_a = base.tax_total.to_f64().unwrap_or(0.0);
    let tax_b = candidate.tax_total.to_f64().unwrap_or(0.0);

    let abs_total_diff_pct = (total_a - total_b).abs() / total_a.abs().max(1.0);
    let days_diff = (base.invoice_date - candidate.invoice_date)
        .num_days()
        .unsigned_abs() as f64;
    let same_po = match (base.po_number.as_deref(), candidate.po_number.as_deref()) {
        (Some(a), Some(b)) if !a.is_empty() && a == b => 1.0,
        _ => 0.0,
    };
    let same_currency = (base.currency == candidate.currency) as u8 as f64;
    let same_tax_total = (round2(tax_a) == round2(tax_b)) as u8 as f64;
    let bank_change_flag = match (&base.remit_account_hash, &candidate.remit_account_hash) {
        (Some(a), Some(b)) => (a != b) as u8 as f64,
        _ => 0.0,
    };
    let payee_name_change_flag = (base.remit_name.as_deref().unwrap_or("")
        != candidate.remit_name.as_deref().unwrap_or("")) as u8 as f64;
    let invnum_edit =
        1.0 - strsim::jaro_winkler(&base.invoice_number_norm, &candidate.invoice_number_norm);

    let line = line_assignment_features(base_lines, candidate_lines);

    let text_cosine = trigram_cosine(
        &space_joined_desc_norm(base_lines),
        &space_joined_desc_norm(candidate_lines),
    );

    FeatureVector {
        abs_total_diff_pct,
        days_diff,
        same_po,
        same_currency,
        same_tax_total,
        bank_change_flag,
        payee_name_change_flag,
        invnum_edit,
        line_coverage_pct: line.line_coverage_pct,
        unmatched_amount_frac: line.unmatched_amount_frac,
        count_new_items: line.count_new_items,
        median_unit_price_diff: line.median_unit_price_diff,
        text_cosine,
    }
}

struct LineFeatures {
    line_coverage_pct: f64,
    unmatched_amount_frac: f64,
    count_new_items: f64,
    median_unit_price_diff: f64,
}

fn line_assignment_features(base_lines: &[LineItem], candidate_lines: &[LineItem]) -> LineFeatures {
    let total_amount: f64 = base_lines
        .iter()
        .filter_map(|l| l.amount.to_f64())
        .sum();

    if base_lines.is_empty() || candidate_lines.is_empty() {
        return LineFeatures {
            line_coverage_pct: 0.0,
            unmatched_amount_frac: 1.0,
            count_new_items: base_lines.len() as f64,
            median_unit_price_diff: total_amount,
        };
    }

    let cost: Vec<Vec<f64>> = base_lines
        .iter()
        .map(|b| {
            candidate_lines
                .iter()
                .map(|c| line_pair_cost(b, c))
                .collect()
        })
        .collect();

    let assignment = min_cost_assignment(&cost);

    let mut matched_amount = 0.0;
    let mut matched_count = 0usize;
    let mut unit_price_diffs: Vec<f64> = Vec::new();
    for (i, col) in assignment.iter().enumerate() {
        if let Some(j) = col {
            matched_amount += base_lines[i].amount.to_f64().unwrap_or(0.0);
            matched_count += 1;
            let up_a = base_lines[i].unit_price.to_f64().unwrap_or(0.0);
            let up_b = candidate_lines[*j].unit_price.to_f64().unwrap_or(0.0);
            unit_price_diffs.push((up_a - up_b).abs());
        }
    }

    let unmatched_amount_frac = if total_amount > 0.0 {
        (total_amount - matched_amount).max(0.0) / total_amount.max(1.0)
    } else {
        1.0
    };
    let line_coverage_pct = 1.0 - unmatched_amount_frac;
    let count_new_items = (base_lines.len().saturating_sub(matched_count)) as f64;
    let median_unit_price_diff = median(&mut unit_price_diffs);

    LineFeatures {
        line_coverage_pct,
        unmatched_amount_frac,
        count_new_items,
        median_unit_price_diff,
    }
}

fn line_pair_cost(base: &LineItem, candidate: &LineItem) -> f64 {
    let desc_cost = 1.0 - strsim::jaro_winkler(&desc_norm(&base.desc), &desc_norm(&candidate.desc));

    let up_a = base.unit_price.to_f64().unwrap_or(0.0);
    let up_b = candidate.unit_price.to_f64().unwrap_or(0.0);
    let up_term = ((up_a - up_b).abs() / up_a.abs().max(1.0)).min(TERM_CAP);

    let qty_a = base.qty.to_f64().unwrap_or(0.0);
    let qty_b = candidate.qty.to_f64().unwrap_or(0.0);
    let qty_term = ((qty_a - qty_b).abs() / qty_a.abs().max(1.0)).min(TERM_CAP);

    DESC_WEIGHT * desc_cost + UNIT_PRICE_WEIGHT * up_term + QTY_WEIGHT * qty_term
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn round2(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

fn space_joined_desc_norm(lines: &[LineItem]) -> String {
    lines
        .iter()
        .map(|l| desc_norm(&l.desc))
        .collect::<Vec<_>>()
        .join(" ")
}

fn trigrams(text: &str) -> HashSet<(char, char, char)> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < 3 {
        return HashSet::new();
    }
    chars
        .windows(3)
        .map(|w| (w[0], w[1], w[2]))
        .collect()
}

/// Character-trigram cosine-proxy similarity: `min(1, 2|A∩B| / max(|A|+|B|, 1))`.
fn trigram_cosine(a: &str, b: &str) -> f64 {
    let set_a = trigrams(a);
    let set_b = trigrams(b);
    let intersection = set_a.intersection(&set_b).count() as f64;
    let denom = (set_a.len() + set_b.len()) as f64;
    (2.0 * intersection / denom.max(1.0)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigram_cosine_identical_strings_is_one() {
        assert_eq!(trigram_cosine("widget kit", "widget kit"), 1.0);
    }

    #[test]
    fn test_trigram_cosine_disjoint_strings_is_zero() {
        assert_eq!(trigram_cosine("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&mut [1.0, 3.0]), 2.0);
        assert_eq!(median(&mut [1.0, 2.0, 9.0]), 2.0);
        assert_eq!(median(&mut []), 0.0);
    }
}
