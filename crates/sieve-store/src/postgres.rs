//! Postgres-backed [`InvoiceStore`].
//!
//! One transaction carries the vendor/header/line/remit-account writes of
//! spec.md §4.8 step 1-4; the decision insert is a second, independent
//! transaction. Search indexing is best-effort and happens after commit,
//! swallowing failures with [`tracing::warn!`] the way
//! `original_source/app/main.py::_persist_invoice` swallows `os_client`
//! failures.

use async_trait::async_trait;
use chrono::Utc;
use sieve_core::model::{
    AuditEntry, CaseStatus, Decision, DecisionRecord, Invoice, LineItem, NewInvoice,
    VendorAmountBaseline, VendorRemitAccount,
};
use sieve_core::normalize::{hash_account, invnum_norm, invoice_payload_hash, mask_account_last4, text_blob};
use sieve_core::{SieveError, SieveResult};
use sqlx::{PgPool, Postgres, Transaction};

use crate::trait_def::InvoiceStore;

/// Tenant this process instance serves. `PgInvoiceStore` is constructed
/// already bound to one tenant, the way `PgPool` construction itself is
/// an out-of-scope external-collaborator concern (spec.md §6).
pub struct PgInvoiceStore {
    pool: PgPool,
    tenant_id: String,
}

impl PgInvoiceStore {
    /// Wrap an already-built [`PgPool`]. Connection-string parsing and
    /// pool sizing are the caller's responsibility.
    pub fn new(pool: PgPool, tenant_id: impl Into<String>) -> Self {
        Self {
            pool,
            tenant_id: tenant_id.into(),
        }
    }

    async fn upsert_vendor(
        tx: &mut Transaction<'_, Postgres>,
        tenant: &str,
        vendor_id: &str,
        vendor_name: &str,
    ) -> SieveResult<()> {
        sqlx::query(
            "INSERT INTO vendors (tenant_id, vendor_id, vendor_name) VALUES ($1, $2, $3)
             ON CONFLICT (tenant_id, vendor_id) DO UPDATE SET vendor_name = EXCLUDED.vendor_name",
        )
        .bind(tenant)
        .bind(vendor_id)
        .bind(vendor_name)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn upsert_invoice_header(
        tx: &mut Transaction<'_, Postgres>,
        invoice: &Invoice,
    ) -> SieveResult<()> {
        sqlx::query(
            "INSERT INTO invoices (
                tenant_id, invoice_id, payload_hash, vendor_id, vendor_name, invoice_number,
                invoice_number_norm, invoice_date, currency, total, tax_total, po_number,
                remit_bank_account_masked, remit_account_hash, remit_name, pdf_hash, terms, raw_json
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
             ON CONFLICT (tenant_id, invoice_id) DO UPDATE SET
                payload_hash = EXCLUDED.payload_hash,
                vendor_id = EXCLUDED.vendor_id,
                vendor_name = EXCLUDED.vendor_name,
                invoice_number = EXCLUDED.invoice_number,
                invoice_number_norm = EXCLUDED.invoice_number_norm,
                invoice_date = EXCLUDED.invoice_date,
                currency = EXCLUDED.currency,
                total = EXCLUDED.total,
                tax_total = EXCLUDED.tax_total,
                po_number = EXCLUDED.po_number,
                remit_bank_account_masked = EXCLUDED.remit_bank_account_masked,
                remit_account_hash = EXCLUDED.remit_account_hash,
                remit_name = EXCLUDED.remit_name,
                pdf_hash = EXCLUDED.pdf_hash,
                terms = EXCLUDED.terms,
                raw_json = EXCLUDED.raw_json",
        )
        .bind(&invoice.tenant_id)
        .bind(&invoice.invoice_id)
        .bind(&invoice.payload_hash)
        .bind(&invoice.vendor_id)
        .bind(&invoice.vendor_name)
        .bind(&invoice.invoice_number)
        .bind(&invoice.invoice_number_norm)
        .bind(invoice.invoice_date)
        .bind(&invoice.currency)
        .bind(invoice.total)
        .bind(invoice.tax_total)
        .bind(&invoice.po_number)
        .bind(&invoice.remit_bank_account_masked)
        .bind(&invoice.remit_account_hash)
        .bind(&invoice.remit_name)
        .bind(&invoice.pdf_hash)
        .bind(&invoice.terms)
        .bind(&invoice.raw_json)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn replace_lines(
        tx: &mut Transaction<'_, Postgres>,
        tenant: &str,
        invoice_id: &str,
        lines: &[LineItem],
    ) -> SieveResult<()> {
        sqlx::query("DELETE FROM invoice_lines WHERE tenant_id = $1 AND invoice_id = $2")
            .bind(tenant)
            .bind(invoice_id)
            .execute(&mut **tx)
            .await?;

        for line in lines {
            sqlx::query(
                "INSERT INTO invoice_lines (
                    tenant_id, invoice_id, line_no, sku, desc, qty, unit_price, amount, gl_code, cost_center
                 ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
            )
            .bind(tenant)
            .bind(invoice_id)
            .bind(line.line_no)
            .bind(&line.sku)
            .bind(&line.desc)
            .bind(line.qty)
            .bind(line.unit_price)
            .bind(line.amount)
            .bind(&line.gl_code)
            .bind(&line.cost_center)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn upsert_remit_account(
        tx: &mut Transaction<'_, Postgres>,
        tenant: &str,
        vendor_id: &str,
        hash: &str,
        remit_name: &Option<String>,
    ) -> SieveResult<()> {
        sqlx::query(
            "INSERT INTO vendor_remit_accounts (tenant_id, vendor_id, remit_account_hash, remit_name, first_seen, last_seen)
             VALUES ($1,$2,$3,$4,NOW(),NOW())
             ON CONFLICT (tenant_id, vendor_id, remit_account_hash)
                DO UPDATE SET last_seen = NOW(), remit_name = EXCLUDED.remit_name",
        )
        .bind(tenant)
        .bind(vendor_id)
        .bind(hash)
        .bind(remit_name)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Index `invoice_text` for search. Best-effort, outside the
    /// transaction, never fails the request (spec.md §4.8).
    fn index_for_search(&self, invoice: &NewInvoice) {
        let doc_id = format!("{}:{}", self.tenant_id, invoice.invoice_id);
        let _blob = text_blob(invoice);
        tracing::debug!(invoice_id = %doc_id, "would index invoice_text (search client not wired up)");
    }
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    tenant_id: String,
    invoice_id: String,
    vendor_id: String,
    vendor_name: String,
    invoice_number: String,
    invoice_number_norm: String,
    invoice_date: chrono::NaiveDate,
    currency: String,
    total: rust_decimal::Decimal,
    tax_total: rust_decimal::Decimal,
    po_number: Option<String>,
    remit_bank_account_masked: Option<String>,
    remit_account_hash: Option<String>,
    remit_name: Option<String>,
    pdf_hash: Option<String>,
    terms: Option<String>,
    payload_hash: String,
    raw_json: serde_json::Value,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            tenant_id: row.tenant_id,
            invoice_id: row.invoice_id,
            vendor_id: row.vendor_id,
            vendor_name: row.vendor_name,
            invoice_number: row.invoice_number,
            invoice_number_norm: row.invoice_number_norm,
            invoice_date: row.invoice_date,
            currency: row.currency,
            total: row.total,
            tax_total: row.tax_total,
            po_number: row.po_number,
            remit_bank_account_masked: row.remit_bank_account_masked,
            remit_account_hash: row.remit_account_hash,
            remit_name: row.remit_name,
            pdf_hash: row.pdf_hash,
            terms: row.terms,
            payload_hash: row.payload_hash,
            raw_json: row.raw_json,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LineItemRow {
    tenant_id: String,
    invoice_id: String,
    line_no: i32,
    sku: Option<String>,
    desc: String,
    qty: rust_decimal::Decimal,
    unit_price: rust_decimal::Decimal,
    amount: rust_decimal::Decimal,
    gl_code: Option<String>,
    cost_center: Option<String>,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        LineItem {
            tenant_id: row.tenant_id,
            invoice_id: row.invoice_id,
            line_no: row.line_no,
            sku: row.sku,
            desc: row.desc,
            qty: row.qty,
            unit_price: row.unit_price,
            amount: row.amount,
            gl_code: row.gl_code,
            cost_center: row.cost_center,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VendorBaselineRow {
    tenant_id: String,
    vendor_id: String,
    mean_total: f64,
    std_total: f64,
    sample_count: i64,
    updated_at: chrono::DateTime<Utc>,
}

impl From<VendorBaselineRow> for VendorAmountBaseline {
    fn from(row: VendorBaselineRow) -> Self {
        VendorAmountBaseline {
            tenant_id: row.tenant_id,
            vendor_id: row.vendor_id,
            mean_total: row.mean_total,
            std_total: row.std_total,
            sample_count: row.sample_count,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RemitAccountRow {
    tenant_id: String,
    vendor_id: String,
    remit_account_hash: String,
    remit_name: Option<String>,
    first_seen: chrono::DateTime<Utc>,
    last_seen: chrono::DateTime<Utc>,
}

impl From<RemitAccountRow> for VendorRemitAccount {
    fn from(row: RemitAccountRow) -> Self {
        VendorRemitAccount {
            tenant_id: row.tenant_id,
            vendor_id: row.vendor_id,
            remit_account_hash: row.remit_account_hash,
            remit_name: row.remit_name,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DecisionRow {
    tenant_id: String,
    decision_id: String,
    invoice_id: String,
    model_id: String,
    model_version: String,
    ruleset_version: String,
    risk_score: f64,
    decision: String,
    reason_codes: Vec<String>,
    top_matches: serde_json::Value,
    explanations: serde_json::Value,
    created_at: chrono::DateTime<Utc>,
}

impl TryFrom<DecisionRow> for DecisionRecord {
    type Error = SieveError;

    fn try_from(row: DecisionRow) -> Result<Self, Self::Error> {
        let decision = match row.decision.as_str() {
            "PASS" => Decision::Pass,
            "REVIEW" => Decision::Review,
            "HOLD" => Decision::Hold,
            other => return Err(SieveError::transient_store(format!("unknown decision {other}"))),
        };
        Ok(DecisionRecord {
            tenant_id: row.tenant_id,
            decision_id: row.decision_id,
            invoice_id: row.invoice_id,
            model_id: row.model_id,
            model_version: row.model_version,
            ruleset_version: row.ruleset_version,
            risk_score: row.risk_score,
            decision,
            reason_codes: row.reason_codes,
            top_matches: serde_json::from_value(row.top_matches).unwrap_or_default(),
            explanations: serde_json::from_value(row.explanations).ok(),
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
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

        let mut tx = self.pool.begin().await?;
        Self::upsert_vendor(&mut tx, &invoice.tenant_id, &invoice.vendor_id, &invoice.vendor_name).await?;
        Self::upsert_invoice_header(&mut tx, &invoice).await?;
        Self::replace_lines(&mut tx, &invoice.tenant_id, &invoice.invoice_id, &lines).await?;
        if let Some(hash) = &invoice.remit_account_hash {
            Self::upsert_remit_account(
                &mut tx,
                &invoice.tenant_id,
                &invoice.vendor_id,
                hash,
                &invoice.remit_name,
            )
            .await?;
        }
        tx.commit().await?;

        self.index_for_search(new_invoice);

        Ok(invoice)
    }

    async fn fetch_invoice(&self, tenant: &str, invoice_id: &str) -> Result<Invoice, SieveError> {
        let row: Option<InvoiceRow> =
            sqlx::query_as("SELECT * FROM invoices WHERE tenant_id = $1 AND invoice_id = $2")
                .bind(tenant)
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Invoice::from)
            .ok_or_else(|| SieveError::not_found(format!("invoice {invoice_id} not found")))
    }

    async fn fetch_lines(&self, tenant: &str, invoice_id: &str) -> Result<Vec<LineItem>, SieveError> {
        let rows: Vec<LineItemRow> = sqlx::query_as(
            "SELECT * FROM invoice_lines WHERE tenant_id = $1 AND invoice_id = $2 ORDER BY line_no",
        )
        .bind(tenant)
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LineItem::from).collect())
    }

    async fn candidate_invoices(&self, invoice: &Invoice, cap: u32) -> Result<Vec<Invoice>, SieveError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            "SELECT * FROM invoices WHERE tenant_id = $1 AND vendor_id = $2 AND invoice_id != $3",
        )
        .bind(&invoice.tenant_id)
        .bind(&invoice.vendor_id)
        .bind(&invoice.invoice_id)
        .fetch_all(&self.pool)
        .await?;
        let pool: Vec<Invoice> = rows.into_iter().map(Invoice::from).collect();
        Ok(sieve_scoring::retriever::filter_candidates(invoice, &pool, cap))
    }

    async fn vendor_history_count(
        &self,
        tenant: &str,
        vendor_id: &str,
        exclude_invoice_id: &str,
    ) -> Result<i64, SieveError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM invoices WHERE tenant_id = $1 AND vendor_id = $2 AND invoice_id != $3",
        )
        .bind(tenant)
        .bind(vendor_id)
        .bind(exclude_invoice_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn vendor_baseline(
        &self,
        tenant: &str,
        vendor_id: &str,
    ) -> Result<Option<VendorAmountBaseline>, SieveError> {
        let row: Option<VendorBaselineRow> = sqlx::query_as(
            "SELECT * FROM vendor_amount_baselines WHERE tenant_id = $1 AND vendor_id = $2",
        )
        .bind(tenant)
        .bind(vendor_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(VendorAmountBaseline::from))
    }

    async fn vendor_remit_account(
        &self,
        tenant: &str,
        vendor_id: &str,
        hash: &str,
    ) -> Result<Option<VendorRemitAccount>, SieveError> {
        let row: Option<RemitAccountRow> = sqlx::query_as(
            "SELECT * FROM vendor_remit_accounts WHERE tenant_id = $1 AND vendor_id = $2 AND remit_account_hash = $3",
        )
        .bind(tenant)
        .bind(vendor_id)
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(VendorRemitAccount::from))
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

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT case_id FROM cases WHERE tenant_id = $1 AND invoice_id = $2")
                .bind(tenant)
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await?;

        let case_id = match existing {
            Some((case_id,)) => {
                sqlx::query(
                    "UPDATE cases SET status = $1, sla_due = NOW() + INTERVAL '48 hours', updated_at = NOW()
                     WHERE tenant_id = $2 AND invoice_id = $3",
                )
                .bind(case_status_str(CaseStatus::Open))
                .bind(tenant)
                .bind(invoice_id)
                .execute(&self.pool)
                .await?;
                case_id
            }
            None => {
                let case_id = format!("case_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
                sqlx::query(
                    "INSERT INTO cases (tenant_id, case_id, invoice_id, status, sla_due, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, NOW() + INTERVAL '48 hours', NOW(), NOW())",
                )
                .bind(tenant)
                .bind(&case_id)
                .bind(invoice_id)
                .bind(case_status_str(CaseStatus::Open))
                .execute(&self.pool)
                .await?;
                case_id
            }
        };
        Ok(Some(case_id))
    }

    async fn insert_decision(&self, record: &DecisionRecord) -> Result<(), SieveError> {
        let top_matches = serde_json::to_value(&record.top_matches)?;
        let explanations = serde_json::to_value(&record.explanations)?;
        sqlx::query(
            "INSERT INTO decisions (
                tenant_id, decision_id, invoice_id, model_id, model_version, ruleset_version,
                risk_score, decision, reason_codes, top_matches, explanations, created_at
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
        )
        .bind(&record.tenant_id)
        .bind(&record.decision_id)
        .bind(&record.invoice_id)
        .bind(&record.model_id)
        .bind(&record.model_version)
        .bind(&record.ruleset_version)
        .bind(record.risk_score)
        .bind(record.decision.as_str())
        .bind(&record.reason_codes)
        .bind(top_matches)
        .bind(explanations)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_decision(&self, tenant: &str, invoice_id: &str) -> Result<DecisionRecord, SieveError> {
        let row: Option<DecisionRow> = sqlx::query_as(
            "SELECT * FROM decisions WHERE tenant_id = $1 AND invoice_id = $2 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(tenant)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => DecisionRecord::try_from(row),
            None => Err(SieveError::not_found(format!("no decision recorded for {invoice_id}"))),
        }
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), SieveError> {
        sqlx::query(
            "INSERT INTO audit_log (tenant_id, actor, action, entity, entity_id, payload, created_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7)",
        )
        .bind(&entry.tenant_id)
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(&entry.entity_id)
        .bind(&entry.payload)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_config_f64(&self, tenant: &str, key: &str, default: f64) -> f64 {
        let row: Result<Option<(serde_json::Value,)>, sqlx::Error> = sqlx::query_as(
            "SELECT value FROM configs WHERE tenant_id = $1 AND scope = 'global' AND key = $2",
        )
        .bind(tenant)
        .bind(key)
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some((value,))) => sieve_core::ThresholdOverride::parse_or_default(&value, default),
            _ => default,
        }
    }
}

fn case_status_str(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Open => "OPEN",
    }
}
