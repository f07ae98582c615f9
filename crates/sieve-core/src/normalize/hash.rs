//! Masking and hashing of sensitive/identifying invoice fields.

use sha2::{Digest, Sha256};

/// Mask a raw bank account/IBAN down to its last four digits for display.
/// Returns `None` for `None` input, `Some("****")` when the account has no
/// digits at all.
pub fn mask_account_last4(account: Option<&str>) -> Option<String> {
    let account = account?;
    let digits: String = account.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Some("****".to_string());
    }
    let last4 = &digits[digits.len().saturating_sub(4)..];
    Some(format!("****{last4}"))
}

/// Deterministic SHA-256 hex digest of a raw remittance account, used for
/// bank-change comparisons without retaining the cleartext account number.
pub fn hash_account(account: Option<&str>) -> Option<String> {
    let account = account?;
    let mut hasher = Sha256::new();
    hasher.update(account.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

/// Stable hash of the canonical invoice payload, used as `payload_hash`.
/// Object keys are sorted recursively so the hash is independent of
/// field-ordering in the caller's JSON.
pub fn invoice_payload_hash(payload: &serde_json::Value) -> String {
    let canonical = canonicalize(payload);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

fn canonicalize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let entries: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{:?}:{}", k, canonicalize(&map[k])))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
        serde_json::Value::Array(items) => {
            let entries: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", entries.join(","))
        }
        other => other.to_string(),
    }
}
