//! Decision records: the append-only log of scoring outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::features::FeatureVector;

/// The three dispositions a scored invoice can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    /// No further action required.
    Pass,
    /// Flagged for manual review; a case is opened.
    Review,
    /// Withheld pending manual review; a case is opened.
    Hold,
}

impl Decision {
    /// Whether this decision requires a manual-review case to be opened.
    pub fn requires_case(&self) -> bool {
        matches!(self, Self::Hold | Self::Review)
    }

    /// The string used in `reason_codes`/API responses and case status
    /// plumbing (`"PASS"`, `"REVIEW"`, `"HOLD"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Review => "REVIEW",
            Self::Hold => "HOLD",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the top-3 candidate matches returned alongside a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMatch {
    /// The candidate invoice's identifier.
    pub invoice_id: String,
    /// The duplicate model's predicted probability for this pair.
    pub similarity: f64,
    /// The full feature vector computed for this pair.
    pub features: FeatureVector,
}

/// A single row in the append-only `decisions` log. `(tenant_id,
/// invoice_id, created_at)` is the natural order; the row with the latest
/// `created_at` for an invoice is the effective decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Owning tenant.
    pub tenant_id: String,
    /// Unique identifier for this decision row (`dec_<12hex>`).
    pub decision_id: String,
    /// The invoice this decision was computed for.
    pub invoice_id: String,
    /// Duplicate-model identifier (for provenance/audit).
    pub model_id: String,
    /// Duplicate-model version (for provenance/audit).
    pub model_version: String,
    /// Rule-engine version (for provenance/audit).
    pub ruleset_version: String,
    /// Fused risk score, 0-100, rounded to 2 decimals.
    pub risk_score: f64,
    /// The chosen disposition.
    pub decision: Decision,
    /// De-duplicated reason codes, first-seen order preserved.
    pub reason_codes: Vec<String>,
    /// Up to the top-3 candidate matches, ranked by similarity descending.
    pub top_matches: Vec<CandidateMatch>,
    /// The top match's feature map, or empty if there were no candidates.
    pub explanations: Option<FeatureVector>,
    /// When this decision was recorded.
    pub created_at: DateTime<Utc>,
}
