//! Anomaly scorer: vendor amount baselines and remittance-account history.

use sieve_core::model::{VendorAmountBaseline, VendorRemitAccount};

use crate::reasons::{BANK_CHANGE, UNIT_PRICE_OUTLIER};

/// `z`-score at or above which a total is flagged as a
/// [`UNIT_PRICE_OUTLIER`].
const OUTLIER_Z_THRESHOLD: f64 = 2.5;
/// `sample_count` above which a vendor baseline with zero recorded
/// standard deviation still contributes a MAD-like fallback `z`.
const COLD_BASELINE_SAMPLE_FLOOR: i64 = 10;
/// Vendors with fewer prior invoices than this get their probability
/// dampened, to avoid over-flagging thin history as anomalous.
const COLD_VENDOR_HISTORY_FLOOR: i64 = 5;

/// Everything the anomaly scorer needs about one invoice's context. All
/// fields are expected to already be resolved by the caller (no I/O
/// happens here).
pub struct AnomalyContext<'a> {
    /// Invoice total being scored.
    pub total: f64,
    /// Raw remittance account hash on the invoice, if present.
    pub remit_account_hash: Option<&'a str>,
    /// Count of prior invoices from this vendor, excluding this one.
    pub vendor_hist_count: i64,
    /// The vendor's amount baseline, if one has been trained.
    pub baseline: Option<&'a VendorAmountBaseline>,
    /// The previously observed remit-account record matching
    /// `remit_account_hash`, if any.
    pub known_remit_account: Option<&'a VendorRemitAccount>,
}

/// Output of the anomaly scorer: a probability in `[0, 1]` and the
/// reason codes it fired.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyResult {
    pub prob: f64,
    pub reasons: Vec<String>,
}

/// Score one invoice for anomalous amount/remittance behavior.
pub fn score(ctx: &AnomalyContext<'_>) -> AnomalyResult {
    let mut reasons = Vec::new();

    let bank_change = match ctx.remit_account_hash {
        None => false,
        Some(_) => match ctx.known_remit_account {
            None => true,
            Some(account) => account.recently_first_seen(),
        },
    };
    if bank_change {
        reasons.push(BANK_CHANGE.to_string());
    }

    let z = match ctx.baseline {
        Some(baseline) if baseline.std_total > 0.0 => {
            (ctx.total - baseline.mean_total).abs() / baseline.std_total
        }
        Some(baseline) if baseline.sample_count > COLD_BASELINE_SAMPLE_FLOOR => {
            (ctx.total - baseline.mean_total).abs() / baseline.mean_total.abs().max(1.0)
        }
        _ => 0.0,
    };
    if z >= OUTLIER_Z_THRESHOLD {
        reasons.push(UNIT_PRICE_OUTLIER.to_string());
    }

    let mut prob = 0.1 + (z / 5.0).min(0.6);
    if bank_change {
        prob += 0.25;
    }
    if ctx.vendor_hist_count < COLD_VENDOR_HISTORY_FLOOR {
        prob *= 0.8;
    }
    let prob = prob.clamp(0.0, 1.0);

    AnomalyResult { prob, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn remit_account(first_seen_secs_ago: i64, last_seen_secs_ago: i64) -> VendorRemitAccount {
        let now = Utc::now();
        VendorRemitAccount {
            tenant_id: "t1".to_string(),
            vendor_id: "v1".to_string(),
            remit_account_hash: "hash".to_string(),
            remit_name: None,
            first_seen: now - chrono::Duration::seconds(first_seen_secs_ago),
            last_seen: now - chrono::Duration::seconds(last_seen_secs_ago),
        }
    }

    #[test]
    fn test_unknown_remit_account_flags_bank_change() {
        let ctx = AnomalyContext {
            total: 1000.0,
            remit_account_hash: Some("hash"),
            vendor_hist_count: 10,
            baseline: None,
            known_remit_account: None,
        };
        let result = score(&ctx);
        assert!(result.reasons.contains(&BANK_CHANGE.to_string()));
        assert!(result.prob >= 0.1 + 0.25);
    }

    #[test]
    fn test_established_remit_account_no_bank_change() {
        let account = remit_account(3600, 0);
        let ctx = AnomalyContext {
            total: 1000.0,
            remit_account_hash: Some("hash"),
            vendor_hist_count: 10,
            baseline: None,
            known_remit_account: Some(&account),
        };
        let result = score(&ctx);
        assert!(!result.reasons.contains(&BANK_CHANGE.to_string()));
    }

    #[test]
    fn test_recently_first_seen_remit_account_flags_bank_change() {
        let account = remit_account(30, 0);
        let ctx = AnomalyContext {
            total: 1000.0,
            remit_account_hash: Some("hash"),
            vendor_hist_count: 10,
            baseline: None,
            known_remit_account: Some(&account),
        };
        let result = score(&ctx);
        assert!(result.reasons.contains(&BANK_CHANGE.to_string()));
    }

    #[test]
    fn test_no_remit_hash_never_flags_bank_change() {
        let ctx = AnomalyContext {
            total: 1000.0,
            remit_account_hash: None,
            vendor_hist_count: 10,
            baseline: None,
            known_remit_account: None,
        };
        assert!(score(&ctx).reasons.is_empty());
    }

    #[test]
    fn test_high_z_score_flags_outlier_and_raises_prob() {
        let baseline = VendorAmountBaseline {
            tenant_id: "t1".to_string(),
            vendor_id: "v1".to_string(),
            mean_total: 1000.0,
            std_total: 50.0,
            sample_count: 100,
            updated_at: Utc::now(),
        };
        let ctx = AnomalyContext {
            total: 2000.0,
            remit_account_hash: None,
            vendor_hist_count: 100,
            baseline: Some(&baseline),
            known_remit_account: None,
        };
        let result = score(&ctx);
        assert!(result.reasons.contains(&UNIT_PRICE_OUTLIER.to_string()));
        assert!(result.prob > 0.5);
    }

    #[test]
    fn test_cold_vendor_dampens_probability() {
        let baseline = VendorAmountBaseline {
            tenant_id: "t1".to_string(),
            vendor_id: "v1".to_string(),
            mean_total: 1000.0,
            std_total: 50.0,
            sample_count: 100,
            updated_at: Utc::now(),
        };
        let warm = score(&AnomalyContext {
            total: 2000.0,
            remit_account_hash: None,
            vendor_hist_count: 100,
            baseline: Some(&baseline),
            known_remit_account: None,
        });
        let cold = score(&AnomalyContext {
            total: 2000.0,
            remit_account_hash: None,
            vendor_hist_count: 1,
            baseline: Some(&baseline),
            known_remit_account: None,
        });
        assert!(cold.prob < warm.prob);
    }
}
