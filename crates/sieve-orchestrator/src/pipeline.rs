//! The scoring pipeline: normalize → persist → retrieve → extract →
//! predict → fuse → decide → persist decision + case + audit.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::Semaphore;

use sieve_core::model::{AuditEntry, CandidateMatch, DecisionRecord, Invoice, NewInvoice};
use sieve_core::{SieveError, SieveResult, SieveSettings};
use sieve_scoring::{reasons, DuplicateModel};
use sieve_store::InvoiceStore;

use crate::types::{Explanation, ScoreResult};

/// Provenance tags written to every decision row. No trained artifact is
/// wired into this deployment, so these always describe the fallback
/// logistic regression.
const MODEL_ID: &str = "dup_model";
const MODEL_VERSION: &str = "v1";
const RULESET_VERSION: &str = "r1";

/// Upper bound on concurrent in-flight candidate feature extractions.
const MAX_CONCURRENT_CANDIDATES: usize = 8;

/// Run the full scoring pipeline for one inbound invoice submission.
///
/// `actor` is the authenticated subject, used only for the audit log
/// entry. Returns the same shape `POST /scoreInvoice` serializes as its
/// response body.
pub async fn score_invoice(
    store: &dyn InvoiceStore,
    settings: &SieveSettings,
    payload: &NewInvoice,
    actor: &str,
) -> SieveResult<ScoreResult> {
    let _span = tracing::info_span!("score_invoice", invoice_id = %payload.invoice_id).entered();

    // Steps 1-2: normalize and persist invoice + lines + vendor + remit,
    // all inside the store's own transaction. Retried once if the store
    // reports the failure as transient.
    with_retry(|| store.persist_invoice(payload)).await?;

    // Step 3: re-read the persisted invoice and lines as the single
    // source of truth, rather than trusting the value just written.
    let invoice = store.fetch_invoice(&settings.tenant_id, &payload.invoice_id).await?;
    let base_lines = store.fetch_lines(&settings.tenant_id, &invoice.invoice_id).await?;

    // Step 4: retrieve candidates and score each pairwise.
    let candidates = store.candidate_invoices(&invoice, settings.candidate_cap).await?;
    let model = DuplicateModel::new();
    let scored = score_candidates(store, &invoice, &base_lines, &candidates, &model).await?;

    // Step 5: keep the top 3 by similarity, ties broken by original
    // (insertion) order since `sort_by` is stable and `scored` already
    // preserves the candidate list's order.
    let mut ranked = scored;
    ranked.sort_by(|a, b| b.0.similarity.partial_cmp(&a.0.similarity).unwrap());
    let top: Vec<(CandidateMatch, Invoice)> = ranked.into_iter().take(3).collect();

    let dup_prob = top.first().map(|(m, _)| m.similarity).unwrap_or(0.0);
    let text_dup_prob = top
        .iter()
        .map(|(m, _)| m.features.text_cosine)
        .fold(0.0_f64, f64::max);

    // Step 6: anomaly scoring.
    let anom = anomaly_score(store, &invoice).await?;
    let bank_change = anom.reasons.iter().any(|r| r == reasons::BANK_CHANGE);

    // Step 7: fuse.
    let fused = sieve_scoring::fuse_scores(dup_prob, anom.prob, bank_change, text_dup_prob);
    let risk_score = (fused * 100.0).round() / 100.0;

    // Step 8: assemble reason codes.
    let reason_codes = build_reason_codes(&invoice, &top, bank_change, &anom.reasons);

    // Step 9: resolve thresholds and decide.
    let review_threshold = store
        .get_config_f64(&invoice.tenant_id, "T_review", settings.review_threshold_default)
        .await;
    let hold_threshold = store
        .get_config_f64(&invoice.tenant_id, "T_hold", settings.hold_threshold_default)
        .await;
    let decision = sieve_scoring::decide(risk_score, review_threshold, hold_threshold)?;

    // Step 10: persist case, decision, audit.
    store
        .upsert_case(&invoice.tenant_id, &invoice.invoice_id, decision)
        .await?;

    let top_matches: Vec<CandidateMatch> = top.iter().map(|(m, _)| m.clone()).collect();
    let explanations = explanations_for(&top);

    let decision_record = DecisionRecord {
        tenant_id: invoice.tenant_id.clone(),
        decision_id: format!("dec_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]),
        invoice_id: invoice.invoice_id.clone(),
        model_id: MODEL_ID.to_string(),
        model_version: MODEL_VERSION.to_string(),
        ruleset_version: RULESET_VERSION.to_string(),
        risk_score,
        decision,
        reason_codes: reason_codes.clone(),
        top_matches: top_matches.clone(),
        explanations: top.first().map(|(m, _)| m.features),
        created_at: chrono::Utc::now(),
    };
    with_retry(|| store.insert_decision(&decision_record)).await?;

    store
        .append_audit(&AuditEntry::score_invoice(
            invoice.tenant_id.clone(),
            actor,
            invoice.invoice_id.clone(),
            risk_score,
            decision.as_str(),
        ))
        .await?;

    tracing::info!(
        invoice_id = %invoice.invoice_id,
        risk_score,
        decision = decision.as_str(),
        "invoice scored"
    );

    Ok(ScoreResult {
        risk_score,
        decision,
        reason_codes,
        top_matches,
        explanations,
    })
}

/// Run `attempt` once, and a second time only if the first failure is a
/// [`SieveError`] the store itself marks retryable (spec.md §7: retried
/// at most once at the transaction boundary).
async fn with_retry<F, Fut, T>(mut attempt: F) -> SieveResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = SieveResult<T>>,
{
    match attempt().await {
        Ok(value) => Ok(value),
        Err(err) if err.is_retryable() => {
            tracing::warn!(error = %err, "retrying transient store error once");
            attempt().await
        }
        Err(err) => Err(err),
    }
}

async fn score_candidates(
    store: &dyn InvoiceStore,
    invoice: &Invoice,
    base_lines: &[sieve_core::model::LineItem],
    candidates: &[Invoice],
    model: &DuplicateModel,
) -> SieveResult<Vec<(CandidateMatch, Invoice)>> {
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_CANDIDATES));

    let futures = candidates.iter().map(|candidate| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .expect("semaphore is never closed");
            let candidate_lines = store
                .fetch_lines(&invoice.tenant_id, &candidate.invoice_id)
                .await?;
            let features = sieve_scoring::features::extract(invoice, base_lines, candidate, &candidate_lines);
            let similarity = model.predict(&features);
            Ok::<_, SieveError>((
                CandidateMatch {
                    invoice_id: candidate.invoice_id.clone(),
                    similarity,
                    features,
                },
                candidate.clone(),
            ))
        }
    });

    join_all(futures).await.into_iter().collect()
}

async fn anomaly_score(
    store: &dyn InvoiceStore,
    invoice: &Invoice,
) -> SieveResult<sieve_scoring::AnomalyResult> {
    let vendor_hist_count = store
        .vendor_history_count(&invoice.tenant_id, &invoice.vendor_id, &invoice.invoice_id)
        .await?;
    let baseline = store
        .vendor_baseline(&invoice.tenant_id, &invoice.vendor_id)
        .await?;
    let known_remit_account = match &invoice.remit_account_hash {
        Some(hash) => {
            store
                .vendor_remit_account(&invoice.tenant_id, &invoice.vendor_id, hash)
                .await?
        }
        None => None,
    };

    let ctx = sieve_scoring::AnomalyContext {
        total: invoice.total.to_f64().unwrap_or(0.0),
        remit_account_hash: invoice.remit_account_hash.as_deref(),
        vendor_hist_count,
        baseline: baseline.as_ref(),
        known_remit_account: known_remit_account.as_ref(),
    };
    Ok(sieve_scoring::anomaly::score(&ctx))
}

/// Rules on the top candidate; ensure `BANK_CHANGE` when flagged; then
/// append anomaly reasons not already present. First-seen order
/// preserved, de-duplicated.
fn build_reason_codes(
    invoice: &Invoice,
    top: &[(CandidateMatch, Invoice)],
    bank_change: bool,
    anom_reasons: &[String],
) -> Vec<String> {
    let mut reason_codes: Vec<String> = Vec::new();

    if let Some((top_match, top_candidate)) = top.first() {
        reason_codes.extend(sieve_scoring::rules::evaluate(
            invoice,
            top_candidate,
            &top_match.features,
            bank_change,
            None,
        ));
    }
    if reason_codes.is_empty() && bank_change {
        reason_codes.push(reasons::BANK_CHANGE.to_string());
    }

    dedup_preserve_order(&mut reason_codes);

    for code in anom_reasons {
        if !reason_codes.contains(code) {
            reason_codes.push(code.clone());
        }
    }

    reason_codes
}

fn dedup_preserve_order(items: &mut Vec<String>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

fn explanations_for(top: &[(CandidateMatch, Invoice)]) -> Vec<Explanation> {
    top.first()
        .map(|(m, _)| {
            m.features
                .as_named_pairs()
                .into_iter()
                .map(|(feature, value)| Explanation {
                    feature: feature.to_string(),
                    value,
                })
                .collect()
        })
        .unwrap_or_default()
}
