//! Append-only audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit log row. One is appended per scoring call, keyed
/// `score/invoice/<id>` by convention (spec.md §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Owning tenant.
    pub tenant_id: String,
    /// The authenticated subject that triggered the action.
    pub actor: String,
    /// Short action verb (e.g. `"score"`).
    pub action: String,
    /// Entity type acted on (e.g. `"invoice"`).
    pub entity: String,
    /// Entity identifier.
    pub entity_id: String,
    /// Action-specific payload, e.g. `{risk_score, decision}`.
    pub payload: serde_json::Value,
    /// When the action occurred.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Build the `score/invoice/<id>` audit entry emitted by the
    /// orchestrator after every scoring call.
    pub fn score_invoice(
        tenant_id: impl Into<String>,
        actor: impl Into<String>,
        invoice_id: impl Into<String>,
        risk_score: f64,
        decision: &str,
    ) -> Self {
        let invoice_id = invoice_id.into();
        Self {
            tenant_id: tenant_id.into(),
            actor: actor.into(),
            action: "score".to_string(),
            entity: "invoice".to_string(),
            entity_id: invoice_id,
            payload: serde_json::json!({
                "risk_score": risk_score,
                "decision": decision,
            }),
            created_at: Utc::now(),
        }
    }
}
