//! Fixed-layout feature vector shared between the feature extractor and
//! the duplicate model.
//!
//! The source system carries features as a dynamic dict keyed by name;
//! here that becomes a record with the 13 named fields, so an unknown key
//! is impossible by construction (spec.md §9).

use serde::{Deserialize, Serialize};

/// Feature order fixed by the duplicate model's fallback weight vector
/// (spec.md §4.4). Kept as a constant for anything that needs to reason
/// about positional order (e.g. weight alignment in tests).
pub const FEATURE_ORDER: [&str; 13] = [
    "abs_total_diff_pct",
    "days_diff",
    "same_po",
    "same_currency",
    "same_tax_total",
    "bank_change_flag",
    "payee_name_change_flag",
    "invnum_edit",
    "line_coverage_pct",
    "unmatched_amount_frac",
    "count_new_items",
    "median_unit_price_diff",
    "text_cosine",
];

/// A `(base, candidate)` pair's feature vector, fixed layout, 13 fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct FeatureVector {
    /// `|total_a - total_b| / max(|total_a|, 1)`.
    pub abs_total_diff_pct: f64,
    /// `|date_a - date_b|` in integer days.
    pub days_diff: f64,
    /// 1.0 when both POs are non-empty and equal.
    pub same_po: f64,
    /// 1.0 when currencies match.
    pub same_currency: f64,
    /// 1.0 when tax totals match after rounding to 2 decimals.
    pub same_tax_total: f64,
    /// 1.0 when both remit hashes are present and distinct.
    pub bank_change_flag: f64,
    /// 1.0 when remit names differ (null treated as empty).
    pub payee_name_change_flag: f64,
    /// `1 - JaroWinkler(invnum_norm_a, invnum_norm_b)`.
    pub invnum_edit: f64,
    /// Fraction of base-invoice amount matched to candidate lines.
    pub line_coverage_pct: f64,
    /// `1 - line_coverage_pct`, clamped the way the assignment step derives it.
    pub unmatched_amount_frac: f64,
    /// Count of unmatched base line items.
    pub count_new_items: f64,
    /// Median absolute unit-price difference over assigned pairs.
    pub median_unit_price_diff: f64,
    /// Character-trigram cosine-proxy similarity between description blobs.
    pub text_cosine: f64,
}

impl FeatureVector {
    /// Return the features as a fixed-order array, matching
    /// [`FEATURE_ORDER`] and the duplicate model's weight vector.
    pub fn as_array(&self) -> [f64; 13] {
        [
            self.abs_total_diff_pct,
            self.days_diff,
            self.same_po,
            self.same_currency,
            self.same_tax_total,
            self.bank_change_flag,
            self.payee_name_change_flag,
            self.invnum_edit,
            self.line_coverage_pct,
            self.unmatched_amount_frac,
            self.count_new_items,
            self.median_unit_price_diff,
            self.text_cosine,
        ]
    }

    /// Return `(feature_name, value)` pairs in fixed order, the shape the
    /// `explanations` field of `ScoreResponse` uses.
    pub fn as_named_pairs(&self) -> Vec<(&'static str, f64)> {
        FEATURE_ORDER
            .iter()
            .copied()
            .zip(self.as_array())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_array_matches_declared_order() {
        let fv = FeatureVector {
            abs_total_diff_pct: 1.0,
            days_diff: 2.0,
            same_po: 3.0,
            same_currency: 4.0,
            same_tax_total: 5.0,
            bank_change_flag: 6.0,
            payee_name_change_flag: 7.0,
            invnum_edit: 8.0,
            line_coverage_pct: 9.0,
            unmatched_amount_frac: 10.0,
            count_new_items: 11.0,
            median_unit_price_diff: 12.0,
            text_cosine: 13.0,
        };
        assert_eq!(
            fv.as_array(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0]
        );
    }

    #[test]
    fn test_named_pairs_length_and_order() {
        let fv = FeatureVector::default();
        let pairs = fv.as_named_pairs();
        assert_eq!(pairs.len(), 13);
        assert_eq!(pairs[0].0, "abs_total_diff_pct");
        assert_eq!(pairs[12].0, "text_cosine");
    }
}
