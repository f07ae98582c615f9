//! Vendor master data and the statistics used by the anomaly scorer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `(tenant_id, vendor_id) -> vendor_name`, upserted on every invoice write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    /// Owning tenant.
    pub tenant_id: String,
    /// Vendor identifier.
    pub vendor_id: String,
    /// Vendor display name.
    pub vendor_name: String,
}

/// `(tenant_id, vendor_id, remit_account_hash) -> (remit_name, first_seen,
/// last_seen)`. `first_seen` is immutable after insert; `last_seen` updates
/// on every upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRemitAccount {
    /// Owning tenant.
    pub tenant_id: String,
    /// Vendor identifier.
    pub vendor_id: String,
    /// SHA-256 hex digest of the raw remittance account.
    pub remit_account_hash: String,
    /// Remittance payee display name as last observed.
    pub remit_name: Option<String>,
    /// When this account hash was first observed for this vendor.
    pub first_seen: DateTime<Utc>,
    /// When this account hash was most recently observed.
    pub last_seen: DateTime<Utc>,
}

impl VendorRemitAccount {
    /// The bank-change heuristic from spec.md §4.5 / §9: an account is
    /// treated as having just appeared for the first time when its
    /// `first_seen`/`last_seen` cluster falls within one minute of each
    /// other. This flags genuinely new accounts, but also re-flags any
    /// account whose upsert history happens to cluster within a minute of
    /// now; the behavior is preserved verbatim rather than tightened, per
    /// the Open Question in spec.md §9.
    pub fn recently_first_seen(&self) -> bool {
        (self.last_seen - self.first_seen) <= chrono::Duration::seconds(60)
    }
}

/// `(tenant_id, vendor_id) -> (mean_total, std_total, sample_count,
/// updated_at)`. Maintained offline by a training job outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorAmountBaseline {
    /// Owning tenant.
    pub tenant_id: String,
    /// Vendor identifier.
    pub vendor_id: String,
    /// Mean invoice total observed for this vendor.
    pub mean_total: f64,
    /// Standard deviation of invoice totals for this vendor.
    pub std_total: f64,
    /// Number of invoices the baseline was computed from.
    pub sample_count: i64,
    /// When the baseline was last recomputed.
    pub updated_at: DateTime<Utc>,
}
