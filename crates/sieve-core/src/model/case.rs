//! Manual-review case records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`Case`]. Only `Open` is reachable today; the
/// state set is kept open-ended (spec.md §3: "States: {OPEN, ...}") for a
/// future manual-resolution workflow that is out of this system's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaseStatus {
    /// Newly opened or re-opened, awaiting manual review.
    Open,
}

/// A manual-review case opened when a decision is HOLD or REVIEW.
/// `(tenant_id, case_id)` is unique; `(tenant_id, invoice_id)` is used to
/// find an existing case for idempotent upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    /// Owning tenant.
    pub tenant_id: String,
    /// Unique case identifier (`case_<12hex>`).
    pub case_id: String,
    /// The invoice this case was opened for.
    pub invoice_id: String,
    /// Current case status.
    pub status: CaseStatus,
    /// SLA due date/time: creation + 48 hours.
    pub sla_due: DateTime<Utc>,
    /// When the case was first created.
    pub created_at: DateTime<Utc>,
    /// When the case was last updated.
    pub updated_at: DateTime<Utc>,
}

/// SLA window applied to every newly created case.
pub fn case_sla() -> chrono::Duration {
    chrono::Duration::hours(48)
}
