//! Reason code constants shared by the rule engine and the anomaly scorer.

/// Both sides' normalized invoice numbers are non-empty and equal.
pub const EXACT_INVNUM: &str = "EXACT_INVNUM";
/// Same PO, near-identical total, within 30 days.
pub const SAME_PO_NEAR_TOTAL: &str = "SAME_PO_NEAR_TOTAL";
/// Same source PDF, or a near-duplicate shingle overlap.
pub const PDF_NEAR_DUP: &str = "PDF_NEAR_DUP";
/// The vendor's remittance account changed, or appeared for the first time.
pub const BANK_CHANGE: &str = "BANK_CHANGE";
/// The invoice total is a statistical outlier against the vendor's baseline.
pub const UNIT_PRICE_OUTLIER: &str = "UNIT_PRICE_OUTLIER";
