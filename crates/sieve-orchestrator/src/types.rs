//! The orchestrator's return shape, mirroring `ScoreResponse` (spec.md §6).

use serde::{Deserialize, Serialize};
use sieve_core::model::{CandidateMatch, Decision};

/// One `{feature, value}` pair in the top match's feature map, in fixed
/// [`sieve_core::model::FEATURE_ORDER`] order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub feature: String,
    pub value: f64,
}

/// The result of a single `score_invoice` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Fused risk score, 0-100, rounded to 2 decimals.
    pub risk_score: f64,
    /// The chosen disposition.
    pub decision: Decision,
    /// De-duplicated reason codes, first-seen order preserved.
    pub reason_codes: Vec<String>,
    /// Up to the top-3 candidate matches, ranked by similarity descending.
    pub top_matches: Vec<CandidateMatch>,
    /// The top match's feature map, or empty when there were no candidates.
    pub explanations: Vec<Explanation>,
}
