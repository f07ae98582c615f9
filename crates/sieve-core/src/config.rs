//! Runtime configuration for the invoice anomaly sieve.
//!
//! Values are loaded from environment variables by the server binary at
//! startup and treated as immutable for the lifetime of the process; this
//! module defines the schema and its validation rules only.

use serde::{Deserialize, Serialize};

/// Process-wide settings, constructed once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SieveSettings {
    /// Tenant this process instance serves.
    pub tenant_id: String,
    /// Default HOLD threshold (0-100), used when a tenant has no override.
    #[serde(default = "default_hold_threshold")]
    pub hold_threshold_default: f64,
    /// Default REVIEW threshold (0-100), used when a tenant has no override.
    #[serde(default = "default_review_threshold")]
    pub review_threshold_default: f64,
    /// HMAC secret used to verify inbound bearer tokens (HS256).
    pub jwt_secret: String,
    /// Expected JWT audience for bearer tokens.
    pub jwt_audience: String,
    /// Expected JWT issuer for bearer tokens.
    pub jwt_issuer: String,
    /// Maximum candidates the retriever returns per scoring call.
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: u32,
}

fn default_hold_threshold() -> f64 {
    80.0
}

fn default_review_threshold() -> f64 {
    50.0
}

fn default_candidate_cap() -> u32 {
    200
}

impl Default for SieveSettings {
    fn default() -> Self {
        Self {
            tenant_id: "tenant_demo".to_string(),
            hold_threshold_default: default_hold_threshold(),
            review_threshold_default: default_review_threshold(),
            jwt_secret: "dev-secret-change-me".to_string(),
            jwt_audience: "invoice.sieve".to_string(),
            jwt_issuer: "local.sieve".to_string(),
            candidate_cap: default_candidate_cap(),
        }
    }
}

impl SieveSettings {
    /// Validate the settings, collecting every problem rather than
    /// failing on the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.tenant_id.trim().is_empty() {
            errors.push("tenant_id must not be empty".to_string());
        }
        if self.jwt_secret.trim().is_empty() {
            errors.push("jwt_secret must not be empty".to_string());
        }
        if !(0.0..=100.0).contains(&self.hold_threshold_default) {
            errors.push("hold_threshold_default must be between 0 and 100".to_string());
        }
        if !(0.0..=100.0).contains(&self.review_threshold_default) {
            errors.push("review_threshold_default must be between 0 and 100".to_string());
        }
        if self.hold_threshold_default < self.review_threshold_default {
            errors.push("hold_threshold_default must be >= review_threshold_default".to_string());
        }
        if self.candidate_cap == 0 {
            errors.push("candidate_cap must be non-zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Return the default `(review, hold)` thresholds as a pair.
    pub fn default_thresholds(&self) -> (f64, f64) {
        (self.review_threshold_default, self.hold_threshold_default)
    }
}

/// A per-tenant threshold override read from the `configs` table.
///
/// The source system stores `value` polymorphically as either a bare
/// number or an object `{"value": n}`; both forms are honored here, and
/// an unparseable value falls back to the default without error (an Open
/// Question in spec.md §9, preserved rather than tightened).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdOverride {
    /// Bare numeric override.
    Number(f64),
    /// Wrapped numeric override.
    Wrapped {
        /// The override value.
        value: f64,
    },
}

impl ThresholdOverride {
    /// Resolve this override to a float, ignoring the wrapper shape.
    pub fn resolve(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Wrapped { value } => *value,
        }
    }

    /// Parse a raw JSON config value into a threshold, falling back to
    /// `default` for any value that does not match either accepted shape.
    pub fn parse_or_default(raw: &serde_json::Value, default: f64) -> f64 {
        serde_json::from_value::<ThresholdOverride>(raw.clone())
            .map(|ov| ov.resolve())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_valid() {
        let settings = SieveSettings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold_ordering() {
        let settings = SieveSettings {
            hold_threshold_default: 40.0,
            review_threshold_default: 50.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_empty_tenant_rejected() {
        let settings = SieveSettings {
            tenant_id: "".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_empty_jwt_secret_rejected() {
        let settings = SieveSettings {
            jwt_secret: "".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_threshold_override_bare_number() {
        let raw = serde_json::json!(75.0);
        assert_eq!(ThresholdOverride::parse_or_default(&raw, 50.0), 75.0);
    }

    #[test]
    fn test_threshold_override_wrapped() {
        let raw = serde_json::json!({"value": 65.0});
        assert_eq!(ThresholdOverride::parse_or_default(&raw, 50.0), 65.0);
    }

    #[test]
    fn test_threshold_override_garbage_falls_back() {
        let raw = serde_json::json!("not-a-number");
        assert_eq!(ThresholdOverride::parse_or_default(&raw, 50.0), 50.0);
    }
}
