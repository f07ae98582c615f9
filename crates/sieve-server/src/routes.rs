//! REST API routes: `POST /scoreInvoice`, `GET /invoice/{id}/decision`,
//! `GET /healthz`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use sieve_core::model::{Decision, DecisionRecord, NewInvoice};
use sieve_core::{SieveError, SieveSettings};
use sieve_orchestrator::ScoreResult;
use sieve_store::InvoiceStore;

use crate::auth::{auth_middleware, AuthConfig, Claims};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InvoiceStore>,
    pub settings: Arc<SieveSettings>,
}

/// Build the router, wiring in CORS, request tracing, and bearer-token
/// verification driven by `auth_config`.
pub fn create_router(state: AppState, auth_config: AuthConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/scoreInvoice", post(score_invoice))
        .route("/invoice/:invoice_id/decision", get(get_decision))
        .route("/healthz", get(healthz))
        .layer(axum::middleware::from_fn(auth_middleware))
        .layer(axum::Extension(auth_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    tenant: String,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tenant: state.settings.tenant_id.clone(),
    })
}

async fn score_invoice(
    State(state): State<AppState>,
    claims: Option<axum::Extension<Claims>>,
    Json(payload): Json<NewInvoice>,
) -> Result<Json<ScoreResult>, ApiError> {
    let actor = claims.map(|c| c.0.sub).unwrap_or_else(|| "anonymous".to_string());
    let result = sieve_orchestrator::score_invoice(state.store.as_ref(), &state.settings, &payload, &actor)
        .await?;
    info!(invoice_id = %payload.invoice_id, decision = result.decision.as_str(), "scored invoice");
    Ok(Json(result))
}

#[derive(Debug, Serialize)]
struct DecisionResponse {
    invoice_id: String,
    risk_score: f64,
    decision: Decision,
    reason_codes: Vec<String>,
}

impl From<DecisionRecord> for DecisionResponse {
    fn from(record: DecisionRecord) -> Self {
        Self {
            invoice_id: record.invoice_id,
            risk_score: record.risk_score,
            decision: record.decision,
            reason_codes: record.reason_codes,
        }
    }
}

async fn get_decision(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let record = state
        .store
        .latest_decision(&state.settings.tenant_id, &invoice_id)
        .await?;
    Ok(Json(record.into()))
}

/// Maps [`SieveError`] onto the HTTP status codes the API surface
/// documents. Defined locally since neither the error type nor
/// [`IntoResponse`] belongs to this crate.
pub struct ApiError(SieveError);

impl From<SieveError> for ApiError {
    fn from(err: SieveError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SieveError::Validation(_) => StatusCode::BAD_REQUEST,
            SieveError::NotFound(_) => StatusCode::NOT_FOUND,
            SieveError::Auth(_) => StatusCode::UNAUTHORIZED,
            SieveError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SieveError::TransientStore(_) | SieveError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            SieveError::Serialization(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.0.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sieve_core::model::NewLineItem;
    use sieve_store::InMemoryStore;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            store: Arc::new(InMemoryStore::new("default")),
            settings: Arc::new(SieveSettings {
                tenant_id: "default".to_string(),
                ..Default::default()
            }),
        }
    }

    fn sample_invoice() -> NewInvoice {
        NewInvoice {
            invoice_id: "I1".to_string(),
            vendor_id: "vendor-1".to_string(),
            vendor_name: "Acme Supplies".to_string(),
            invoice_number: "INV-1".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            currency: "USD".to_string(),
            total: dec!(100.00),
            tax_total: None,
            po_number: None,
            remit_bank_iban_or_account: None,
            remit_name: None,
            pdf_hash: None,
            terms: None,
            line_items: vec![NewLineItem {
                desc: "paper a4".to_string(),
                qty: dec!(10),
                unit_price: dec!(10),
                amount: dec!(100),
                sku: None,
                gl_code: None,
                cost_center: None,
            }],
        }
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let router = create_router(state(), AuthConfig::disabled());
        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn score_invoice_then_fetch_decision_round_trips() {
        let router = create_router(state(), AuthConfig::disabled());
        let body = serde_json::to_vec(&sample_invoice()).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/scoreInvoice")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder().uri("/invoice/I1/decision").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_invoice_decision_is_404() {
        let router = create_router(state(), AuthConfig::disabled());
        let request = Request::builder().uri("/invoice/missing/decision").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
