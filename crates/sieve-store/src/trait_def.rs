//! The storage seam every component above this crate depends on.

use async_trait::async_trait;
use sieve_core::model::{
    AuditEntry, Decision, DecisionRecord, Invoice, LineItem, NewInvoice, VendorAmountBaseline,
    VendorRemitAccount,
};
use sieve_core::SieveError;

/// Everything the scoring pipeline needs from durable storage. The
/// transactional contract (spec.md §4.8) is the implementation's
/// responsibility, not the trait's: callers see only the happy-path
/// return values or a [`SieveError`].
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Normalize, validate, and persist an inbound invoice (vendor
    /// upsert, header upsert, line replace, remit-account upsert) as one
    /// transaction. Returns the persisted, normalized row.
    async fn persist_invoice(&self, invoice: &NewInvoice) -> Result<Invoice, SieveError>;

    /// Fetch a previously persisted invoice header.
    async fn fetch_invoice(&self, tenant: &str, invoice_id: &str) -> Result<Invoice, SieveError>;

    /// Fetch an invoice's line items, ordered by `line_no`.
    async fn fetch_lines(&self, tenant: &str, invoice_id: &str) -> Result<Vec<LineItem>, SieveError>;

    /// Return up to `cap` same-tenant, same-vendor invoices (excluding
    /// `invoice`) that match the blocking predicates in spec.md §4.2.
    async fn candidate_invoices(&self, invoice: &Invoice, cap: u32) -> Result<Vec<Invoice>, SieveError>;

    /// Count prior invoices from this vendor, excluding `exclude_invoice_id`.
    async fn vendor_history_count(
        &self,
        tenant: &str,
        vendor_id: &str,
        exclude_invoice_id: &str,
    ) -> Result<i64, SieveError>;

    /// Fetch the vendor's trained amount baseline, if any.
    async fn vendor_baseline(
        &self,
        tenant: &str,
        vendor_id: &str,
    ) -> Result<Option<VendorAmountBaseline>, SieveError>;

    /// Fetch the remit-account history row matching `hash`, if any.
    async fn vendor_remit_account(
        &self,
        tenant: &str,
        vendor_id: &str,
        hash: &str,
    ) -> Result<Option<VendorRemitAccount>, SieveError>;

    /// Open or refresh the manual-review case for `invoice_id` when
    /// `decision` requires one. Returns the case id, or `None` when no
    /// case was needed.
    async fn upsert_case(
        &self,
        tenant: &str,
        invoice_id: &str,
        decision: Decision,
    ) -> Result<Option<String>, SieveError>;

    /// Append a decision record. Decisions are append-only.
    async fn insert_decision(&self, record: &DecisionRecord) -> Result<(), SieveError>;

    /// Fetch the most recently recorded decision for an invoice.
    async fn latest_decision(&self, tenant: &str, invoice_id: &str) -> Result<DecisionRecord, SieveError>;

    /// Append an audit log entry. Audit entries are append-only.
    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), SieveError>;

    /// Resolve a per-tenant config override, falling back to `default`
    /// when unset or unparseable (spec.md §9's polymorphic `value` Open
    /// Question).
    async fn get_config_f64(&self, tenant: &str, key: &str, default: f64) -> f64;
}
