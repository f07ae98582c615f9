//! Invoice header and line item entities, and the inbound submission
//! shapes the HTTP layer accepts before normalization.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single line item as submitted by the caller, prior to normalization
/// and `line_no` assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    /// Free-text line description.
    pub desc: String,
    /// Quantity billed.
    pub qty: Decimal,
    /// Unit price.
    pub unit_price: Decimal,
    /// Extended line amount.
    pub amount: Decimal,
    /// Stock-keeping unit, if known.
    pub sku: Option<String>,
    /// General-ledger account code.
    pub gl_code: Option<String>,
    /// Cost center.
    pub cost_center: Option<String>,
}

/// Inbound invoice payload (`InvoiceIn` in spec.md §6), as received by
/// `POST /scoreInvoice` before any normalization has run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    /// Caller-assigned invoice identifier, unique within the tenant.
    pub invoice_id: String,
    /// Vendor identifier.
    pub vendor_id: String,
    /// Vendor display name.
    pub vendor_name: String,
    /// Raw invoice number as printed on the document.
    pub invoice_number: String,
    /// Invoice date, day precision.
    pub invoice_date: NaiveDate,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Invoice total. Must be non-negative.
    pub total: Decimal,
    /// Tax total; `None` is treated as zero.
    pub tax_total: Option<Decimal>,
    /// Purchase order reference, if any.
    pub po_number: Option<String>,
    /// Raw remittance bank account or IBAN as submitted.
    pub remit_bank_iban_or_account: Option<String>,
    /// Remittance payee display name.
    pub remit_name: Option<String>,
    /// Hash of the source PDF, if the caller computed one.
    pub pdf_hash: Option<String>,
    /// Payment terms text.
    pub terms: Option<String>,
    /// Line items. Must be non-empty.
    pub line_items: Vec<NewLineItem>,
}

impl NewInvoice {
    /// Validate the inbound payload, collecting every problem rather
    /// than failing on the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.invoice_id.trim().is_empty() {
            errors.push("invoice_id must not be empty".to_string());
        }
        if self.line_items.is_empty() {
            errors.push("line_items must not be empty".to_string());
        }
        if self.total < Decimal::ZERO {
            errors.push("total must be non-negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Persisted invoice header. Invariant: `total >= 0`; `invoice_number_norm`
/// is the deterministic output of [`crate::normalize::invnum_norm`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Owning tenant.
    pub tenant_id: String,
    /// Invoice identifier, unique within the tenant.
    pub invoice_id: String,
    /// Vendor identifier.
    pub vendor_id: String,
    /// Vendor display name.
    pub vendor_name: String,
    /// Raw invoice number as printed on the document.
    pub invoice_number: String,
    /// Normalized invoice number, used for equality comparisons.
    pub invoice_number_norm: String,
    /// Invoice date, day precision.
    pub invoice_date: NaiveDate,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Invoice total.
    pub total: Decimal,
    /// Tax total; zero when not supplied.
    pub tax_total: Decimal,
    /// Purchase order reference, if any.
    pub po_number: Option<String>,
    /// Display-only masked remittance account (`****1234`).
    pub remit_bank_account_masked: Option<String>,
    /// SHA-256 hex digest of the raw remittance account, if present.
    pub remit_account_hash: Option<String>,
    /// Remittance payee display name.
    pub remit_name: Option<String>,
    /// Hash of the source PDF, if supplied.
    pub pdf_hash: Option<String>,
    /// Payment terms text.
    pub terms: Option<String>,
    /// Stable hash of the canonical invoice payload.
    pub payload_hash: String,
    /// The full submitted payload, retained for audit/replay.
    pub raw_json: serde_json::Value,
}

impl Invoice {
    /// Whether the total satisfies the non-negativity invariant.
    pub fn has_valid_total(&self) -> bool {
        self.total >= Decimal::ZERO
    }
}

/// A persisted, gap-free, 1-indexed line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Owning tenant.
    pub tenant_id: String,
    /// Owning invoice.
    pub invoice_id: String,
    /// 1-based line number, gap-free within an invoice.
    pub line_no: i32,
    /// Stock-keeping unit, if known.
    pub sku: Option<String>,
    /// Free-text line description.
    pub desc: String,
    /// Quantity billed.
    pub qty: Decimal,
    /// Unit price.
    pub unit_price: Decimal,
    /// Extended line amount.
    pub amount: Decimal,
    /// General-ledger account code.
    pub gl_code: Option<String>,
    /// Cost center.
    pub cost_center: Option<String>,
}
