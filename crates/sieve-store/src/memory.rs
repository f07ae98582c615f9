//! In-memory [`InvoiceStore`] test double.
//!
//! Exercises the same trait as [`crate::postgres::PgInvoiceStore`] without a
//! database, so `sieve-scoring` and `sieve-orchestrator` tests can run
//! against a real implementation rather than a mock.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sieve_core::model::{
    case_sla, AuditEntry, Case, CaseStatus, Decision, DecisionRecord, Invoice, LineItem, NewInvoice,
    VendorAmountBaseline, VendorRemitAccount,
};
use sieve_core::normalize::{hash_account, invnum_norm, invoice_payload_hash, mask_account_last4};
use sieve_core::SieveError;

use crate::trait_def::InvoiceStore;

type InvoiceKey = (String, String);
type VendorKey = (String, String);
type RemitKey = (String, String, String);
type ConfigKey = (String, String);

#[derive(Default)]
struct Inner {
    invoices: HashMap<InvoiceKey, Invoice>,
    lines: HashMap<InvoiceKey, Vec<LineItem>>,
    baselines: HashMap<VendorKey, VendorAmountBaseline>,
    remit_accounts: HashMap<RemitKey, VendorRemitAccount>,
    cases: HashMap<InvoiceKey, Case>,
    decisions: Vec<DecisionRecord>,
    audit_log: Vec<AuditEntry>,
    configs: HashMap<ConfigKey, f64>,
}

/// `Mutex<HashMap<...>>`-backed store. Seed vendor baselines, remit
/// history, and config overrides directly through the `seed_*` helpers
/// before exercising the pipeline against it.
pub struct InMemoryStore {
    tenant_id: String,
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Seed a vendor's amount baseline, as a training job would.
    pub fn seed_baseline(&self, baseline: VendorAmountBaseline) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .baselines
            .insert((baseline.tenant_id.clone(), baseline.vendor_id.clone()), baseline);
    }

    /// Seed a per-tenant config override.
    pub fn seed_config(&self, tenant: &str, key: &str, value: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.configs.insert((tenant.to_string(), key.to_string()), value);
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn persist_invoice(&self, new_invoice: &NewInvoice) -> Result<Invoice, SieveError> {
        new_invoice
            .validate()
            .map_err(|errors| SieveError::validation(errors.join("; ")))?;

        let raw_json = serde_json::to_value(new_invoice)?;
        let invoice = Invoice {
            tenant_id: self.tenant_id.clone(),
            invoice_id: new_invoice.invoice_id.clone(),
            vendor_id: new_invoice.vendor_id.clone(),
            vendor_name: new_invoice.vendor_name.clone(),
            invoice_number: new_invoice.invoice_number.clone(),
            invoice_number_norm: invnum_norm(&new_invoice.invoice_number),
            invoice_date: new_invoice.invoice_date,
            currency: new_invoice.currency.clone(),
            total: new_invoice.total,
            tax_total: new_invoice.tax_total.unwrap_or_default(),
            po_number: new_invoice.po_number.clone(),
            remit_bank_account_masked: mask_account_last4(
                new_invoice.remit_bank_iban_or_account.as_deref(),
            ),
            remit_account_hash: hash_account(new_invoice.remit_bank_iban_or_account.as_deref()),
            remit_name: new_invoice.remit_name.clone(),
            pdf_hash: new_invoice.pdf_hash.clone(),
            terms: new_invoice.terms.clone(),
            payload_hash: invoice_payload_hash(&raw_json),
            raw_json,
        };

        let lines: Vec<LineItem> = new_invoice
            .line_items
            .iter()
            .enumerate()
            .map(|(idx, line)| LineItem {
                tenant_id: invoice.tenant_id.clone(),
                invoice_id: invoice.invoice_id.clone(),
                line_no: (idx + 1) as i32,
                sku: line.sku.clone(),
                desc: line.desc.clone(),
                qty: line.qty,
                unit_price: line.unit_price,
                amount: line.amount,
                gl_code: line.gl_code.clone(),
                cost_center: line.cost_center.clone(),
            })
            .collect();

        let mut inner = self.inner.lock().unwrap();
        let key = (invoice.tenant_id.clone(), invoice.invoice_id.clone());

        if let Some(hash) = invoice.remit_account_hash.clone() {
            let remit_key = (invoice.tenant_id.clone(), invoice.vendor_id.clone(), hash.clone());
            let now = Utc::now();
            inner
                .remit_accounts
                .entry(remit_key)
                .and_modify(|existing| {
                    existing.last_seen = now;
                    existing.remit_name = invoice.remit_name.clone();
                })
                .or_insert_with(|| VendorRemitAccount {
                    tenant_id: invoice.tenant_id.clone(),
                    vendor_id: invoice.vendor_id.clone(),
                    remit_account_hash: hash,
                    remit_name: invoice.remit_name.clone(),
                    first_seen: now,
                    last_seen: now,
                });
        }

        inner.lines.insert(key.clone(), lines);
        inner.invoices.insert(key, invoice.clone());
        Ok(invoice)
    }

    async fn fetch_invoice(&self, tenant: &str, invoice_id: &str) -> Result<Invoice, SieveError> {
        let inner = self.inner.lock().unwrap();
        inner
            .invoices
            .get(&(tenant.to_string(), invoice_id.to_string()))
            .cloned()
            .ok_or_else(|| SieveError::not_found(format!("invoice {invoice_id} not found")))
    }

    async fn fetch_lines(&self, tenant: &str, invoice_id: &str) -> Result<Vec<LineItem>, SieveError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .lines
            .get(&(tenant.to_string(), invoice_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn candidate_invoices(&self, invoice: &Invoice, cap: u32) -> Result<Vec<Invoice>, SieveError> {
        let inner = self.inner.lock().unwrap();
        let pool: Vec<Invoice> = inner
            .invoices
            .values()
            .filter(|candidate| {
                candidate.tenant_id == invoice.tenant_id && candidate.vendor_id == invoice.vendor_id
            })
            .cloned()
            .collect();
        Ok(sieve_scoring::retriever::filter_candidates(invoice, &pool, cap))
    }

    async fn vendor_history_count(
        &self,
        tenant: &str,
        vendor_id: &str,
        exclude_invoice_id: &str,
    ) -> Result<i64, SieveError> {
        let inner = self.inner.lock().unwrap();
        let count = inner
            .invoices
            .values()
            .filter(|inv| {
                inv.tenant_id == tenant && inv.vendor_id == vendor_id && inv.invoice_id != exclude_invoice_id
            })
            .count();
        Ok(count as i64)
    }

    async fn vendor_baseline(
        &self,
        tenant: &str,
        vendor_id: &str,
    ) -> Result<Option<VendorAmountBaseline>, SieveError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .baselines
            .get(&(tenant.to_string(), vendor_id.to_string()))
            .cloned())
    }

    async fn vendor_remit_account(
        &self,
        tenant: &str,
        vendor_id: &str,
        hash: &str,
    ) -> Result<Option<VendorRemitAccount>, SieveError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .remit_accounts
            .get(&(tenant.to_string(), vendor_id.to_string(), hash.to_string()))
            .cloned())
    }

    async fn upsert_case(
        &self,
        tenant: &str,
        invoice_id: &str,
        decision: Decision,
    ) -> Result<Option<String>, SieveError> {
        if !decision.requires_case() {
            return Ok(None);
        }
        let mut inner = self.inner.lock().unwrap();
        let key = (tenant.to_string(), invoice_id.to_string());
        let now = Utc::now();
        let case_id = if let Some(existing) = inner.cases.get_mut(&key) {
            existing.status = CaseStatus::Open;
            existing.sla_due = now + case_sla();
            existing.updated_at = now;
            existing.case_id.clone()
        } else {
            let case_id = format!("case_{}", &uuid_hex()[..12]);
            inner.cases.insert(
                key,
                Case {
                    tenant_id: tenant.to_string(),
                    case_id: case_id.clone(),
                    invoice_id: invoice_id.to_string(),
                    status: CaseStatus::Open,
                    sla_due: now + case_sla(),
                    created_at: now,
                    updated_at: now,
                },
            );
            case_id
        };
        Ok(Some(case_id))
    }

    async fn insert_decision(&self, record: &DecisionRecord) -> Result<(), SieveError> {
        let mut inner = self.inner.lock().unwrap();
        inner.decisions.push(record.clone());
        Ok(())
    }

    async fn latest_decision(&self, tenant: &str, invoice_id: &str) -> Result<DecisionRecord, SieveError> {
        let inner = self.inner.lock().unwrap();
        inner
            .decisions
            .iter()
            .filter(|d| d.tenant_id == tenant && d.invoice_id == invoice_id)
            .max_by_key(|d| d.created_at)
            .cloned()
            .ok_or_else(|| SieveError::not_found(format!("no decision recorded for {invoice_id}")))
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), SieveError> {
        let mut inner = self.inner.lock().unwrap();
        inner.audit_log.push(entry.clone());
        Ok(())
    }

    async fn get_config_f64(&self, tenant: &str, key: &str, default: f64) -> f64 {
        let inner = self.inner.lock().unwrap();
        inner
            .configs
            .get(&(tenant.to_string(), key.to_string()))
            .copied()
            .unwrap_or(default)
    }
}

/// Cheap non-cryptographic hex id generator, good enough for the
/// in-memory double's case ids (the Postgres path uses real randomness).
fn uuid_hex() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{nanos:032x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sieve_core::model::NewLineItem;

    fn new_invoice(id: &str) -> NewInvoice {
        NewInvoice {
            invoice_id: id.to_string(),
            vendor_id: "v1".to_string(),
            vendor_name: "Acme".to_string(),
            invoice_number: "INV-100".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            currency: "USD".to_string(),
            total: dec!(100.00),
            tax_total: None,
            po_number: None,
            remit_bank_iban_or_account: None,
            remit_name: None,
            pdf_hash: None,
            terms: None,
            line_items: vec![NewLineItem {
                desc: "Widget".to_string(),
                qty: dec!(1),
                unit_price: dec!(100.00),
                amount: dec!(100.00),
                sku: None,
                gl_code: None,
                cost_center: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_persist_then_fetch_round_trips() {
        let store = InMemoryStore::new("default");
        let persisted = store.persist_invoice(&new_invoice("inv-1")).await.unwrap();
        assert_eq!(persisted.invoice_number_norm, "100");

        let fetched = store.fetch_invoice("default", "inv-1").await.unwrap();
        assert_eq!(fetched.invoice_id, "inv-1");

        let lines = store.fetch_lines("default", "inv-1").await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line_no, 1);
    }

    #[tokio::test]
    async fn test_fetch_missing_invoice_errors() {
        let store = InMemoryStore::new("default");
        let result = store.fetch_invoice("default", "missing").await;
        assert!(matches!(result, Err(SieveError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_line_items_rejected() {
        let store = InMemoryStore::new("default");
        let mut invoice = new_invoice("inv-2");
        invoice.line_items.clear();
        let result = store.persist_invoice(&invoice).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_upsert_case_reuses_id_across_calls() {
        let store = InMemoryStore::new("default");
        store.persist_invoice(&new_invoice("inv-3")).await.unwrap();
        let first = store
            .upsert_case("default", "inv-3", Decision::Hold)
            .await
            .unwrap()
            .unwrap();
        let second = store
            .upsert_case("default", "inv-3", Decision::Review)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_upsert_case_noop_for_pass() {
        let store = InMemoryStore::new("default");
        let result = store.upsert_case("default", "inv-4", Decision::Pass).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_config_f64_falls_back_to_default() {
        let store = InMemoryStore::new("default");
        assert_eq!(store.get_config_f64("default", "T_hold", 80.0).await, 80.0);
        store.seed_config("default", "T_hold", 90.0);
        assert_eq!(store.get_config_f64("default", "T_hold", 80.0).await, 90.0);
    }
}
