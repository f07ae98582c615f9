//! Combines the duplicate model, text similarity, and anomaly scorer into
//! one risk score, then maps the score to a decision.

use sieve_core::model::Decision;
use sieve_core::{SieveError, SieveResult};

const DUP_WEIGHT: f64 = 0.7;
const TEXT_WEIGHT: f64 = 0.2;
const ANOM_WEIGHT: f64 = 0.1;
const BANK_CHANGE_BOOST: f64 = 15.0;
const BANK_CHANGE_FLOOR: f64 = 80.0;

/// Fuse the duplicate-model probability, anomaly probability, and text
/// similarity into a single `[0, 100]` risk score. A detected bank change
/// floors the score at [`BANK_CHANGE_FLOOR`].
pub fn fuse_scores(dup: f64, anom: f64, bank_change: bool, text_dup: f64) -> f64 {
    let raw = (DUP_WEIGHT * dup + TEXT_WEIGHT * dup.max(text_dup) + ANOM_WEIGHT * anom) * 100.0;
    let raw = if bank_change {
        (raw + BANK_CHANGE_BOOST).min(100.0).max(BANK_CHANGE_FLOOR)
    } else {
        raw
    };
    raw.clamp(0.0, 100.0)
}

/// Map a fused risk score to a disposition, given per-tenant thresholds.
///
/// # Errors
/// Returns [`SieveError::Config`] if `hold_threshold < review_threshold`.
pub fn decide(score: f64, review_threshold: f64, hold_threshold: f64) -> SieveResult<Decision> {
    if hold_threshold < review_threshold {
        return Err(SieveError::config(format!(
            "hold_threshold ({hold_threshold}) must be >= review_threshold ({review_threshold})"
        )));
    }
    Ok(if score >= hold_threshold {
        Decision::Hold
    } else if score >= review_threshold {
        Decision::Review
    } else {
        Decision::Pass
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuse_scores_weights_components() {
        let score = fuse_scores(1.0, 0.0, false, 0.0);
        assert!((score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_fuse_scores_text_dup_raises_score_when_higher_than_dup() {
        let with_text = fuse_scores(0.0, 0.0, false, 1.0);
        let without_text = fuse_scores(0.0, 0.0, false, 0.0);
        assert!(with_text > without_text);
    }

    #[test]
    fn test_bank_change_floors_score_at_eighty() {
        let score = fuse_scores(0.0, 0.0, true, 0.0);
        assert!((score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_bank_change_caps_score_at_hundred() {
        let score = fuse_scores(1.0, 1.0, true, 1.0);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_decide_boundaries() {
        assert_eq!(decide(50.0, 50.0, 80.0).unwrap(), Decision::Review);
        assert_eq!(decide(80.0, 50.0, 80.0).unwrap(), Decision::Hold);
        assert_eq!(decide(49.9, 50.0, 80.0).unwrap(), Decision::Pass);
    }

    #[test]
    fn test_decide_rejects_inverted_thresholds() {
        assert!(decide(60.0, 80.0, 50.0).is_err());
    }
}
