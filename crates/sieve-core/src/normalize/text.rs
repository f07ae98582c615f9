//! Invoice number and free-text normalization.

use crate::model::{NewInvoice, NewLineItem};

const INV_PREFIXES: [&str; 3] = ["INVOICE", "INV", "BILL"];

/// Normalize a raw invoice number for equality comparisons:
/// upper-case, strip whitespace/`-_/` separators, drop a leading
/// `INVOICE`/`INV`/`BILL` prefix, strip leading zeros. Falls back to
/// `"0"` if nothing is left.
pub fn invnum_norm(value: &str) -> String {
    let upper: String = value
        .trim()
        .chars()
        .flat_map(char::to_uppercase)
        .filter(|c| !matches!(c, ' ' | '\t' | '\n' | '\r' | '-' | '_' | '/'))
        .collect();

    let stripped = INV_PREFIXES
        .iter()
        .find_map(|prefix| upper.strip_prefix(prefix))
        .unwrap_or(upper.as_str());

    let trimmed = stripped.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalize free text for similarity comparison: lower-case,
/// collapse anything that isn't `[a-z0-9]` to a single space.
pub fn desc_norm(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_space = false;
    for ch in value.chars().flat_map(char::to_lowercase) {
        let is_word = ch.is_ascii_alphanumeric();
        if is_word {
            out.push(ch);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim().to_string()
}

/// Concatenate vendor/header/line free text into one lower-cased blob,
/// the input to the feature extractor's text-cosine similarity.
pub fn text_blob(invoice: &NewInvoice) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3 + invoice.line_items.len() * 2);
    parts.push(invoice.vendor_name.as_str());
    if let Some(po) = invoice.po_number.as_deref() {
        parts.push(po);
    }
    if let Some(terms) = invoice.terms.as_deref() {
        parts.push(terms);
    }
    for line in &invoice.line_items {
        let NewLineItem { sku, desc, .. } = line;
        if let Some(sku) = sku.as_deref() {
            parts.push(sku);
        }
        parts.push(desc.as_str());
    }
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invnum_norm_strips_prefix_and_zeros() {
        assert_eq!(invnum_norm("INV-000123"), "123");
        assert_eq!(invnum_norm("Invoice 00045"), "45");
        assert_eq!(invnum_norm("bill_0001"), "1");
    }

    #[test]
    fn test_invnum_norm_all_zeros_falls_back_to_zero() {
        assert_eq!(invnum_norm("INV-0000"), "0");
        assert_eq!(invnum_norm(""), "0");
    }

    #[test]
    fn test_desc_norm_collapses_punctuation() {
        assert_eq!(desc_norm("Widget-Kit, 10mm  (blue)"), "widget kit 10mm blue");
    }

    #[test]
    fn test_desc_norm_trims_edges() {
        assert_eq!(desc_norm("  ## Hello ##  "), "hello");
    }
}
