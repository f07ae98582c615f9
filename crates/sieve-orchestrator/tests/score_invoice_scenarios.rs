//! End-to-end scoring scenarios against an in-memory store, covering the
//! literal fixtures used to validate the pipeline's behavior.

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use sieve_core::model::{NewLineItem, VendorAmountBaseline};
use sieve_core::SieveSettings;
use sieve_orchestrator::score_invoice;
use sieve_store::{InMemoryStore, InvoiceStore};

fn settings() -> SieveSettings {
    SieveSettings {
        tenant_id: "default".to_string(),
        ..Default::default()
    }
}

fn invoice(id: &str, invnum: &str, total: rust_decimal::Decimal, date: NaiveDate) -> sieve_core::model::NewInvoice {
    sieve_core::model::NewInvoice {
        invoice_id: id.to_string(),
        vendor_id: "vendor-1".to_string(),
        vendor_name: "Acme Supplies".to_string(),
        invoice_number: invnum.to_string(),
        invoice_date: date,
        currency: "USD".to_string(),
        total,
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
async fn scenario_identical_resubmission_holds_on_exact_invnum() {
    let store = InMemoryStore::new("default");
    let settings = settings();

    let first = invoice("I1", "INV-000123", dec!(100.00), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    score_invoice(&store, &settings, &first, "tester").await.unwrap();

    let second = invoice("I1", "INV-000123", dec!(100.00), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    let result = score_invoice(&store, &settings, &second, "tester").await.unwrap();

    assert_eq!(result.decision, sieve_core::model::Decision::Hold);
    assert!(result.reason_codes.contains(&"EXACT_INVNUM".to_string()));
}

#[tokio::test]
async fn scenario_bank_change_forces_hold_above_eighty() {
    let store = InMemoryStore::new("default");
    let settings = settings();

    let mut prior = invoice("I1", "INV-1", dec!(500.00), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    prior.remit_bank_iban_or_account = Some("DE00-ACCOUNT-ONE".to_string());
    score_invoice(&store, &settings, &prior, "tester").await.unwrap();

    let mut next = invoice("I2", "INV-2", dec!(500.00), NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
    next.remit_bank_iban_or_account = Some("DE00-ACCOUNT-TWO".to_string());
    let result = score_invoice(&store, &settings, &next, "tester").await.unwrap();

    assert!(result.reason_codes.contains(&"BANK_CHANGE".to_string()));
    assert!(result.risk_score >= 80.0);
    assert_eq!(result.decision, sieve_core::model::Decision::Hold);
}

#[tokio::test]
async fn scenario_amount_outlier_flags_and_caps_probability() {
    let store = InMemoryStore::new("default");
    let settings = settings();
    store.seed_baseline(VendorAmountBaseline {
        tenant_id: "default".to_string(),
        vendor_id: "vendor-1".to_string(),
        mean_total: 100.0,
        std_total: 10.0,
        sample_count: 50,
        updated_at: Utc::now(),
    });

    let invoice = invoice("I1", "INV-1", dec!(200.00), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    let result = score_invoice(&store, &settings, &invoice, "tester").await.unwrap();

    assert!(result.reason_codes.contains(&"UNIT_PRICE_OUTLIER".to_string()));
}

#[tokio::test]
async fn scenario_po_near_duplicate_rule_is_distance_sensitive() {
    let store = InMemoryStore::new("default");
    let settings = settings();

    let mut base = invoice("I1", "INV-1", dec!(100.00), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
    base.po_number = Some("PO-9".to_string());
    score_invoice(&store, &settings, &base, "tester").await.unwrap();

    let mut near = invoice("I2", "INV-2", dec!(100.40), NaiveDate::from_ymd_opt(2024, 4, 6).unwrap());
    near.po_number = Some("PO-9".to_string());
    let near_result = score_invoice(&store, &settings, &near, "tester").await.unwrap();
    assert!(near_result.reason_codes.contains(&"SAME_PO_NEAR_TOTAL".to_string()));

    let mut far = invoice("I3", "INV-3", dec!(106.00), NaiveDate::from_ymd_opt(2024, 4, 6).unwrap());
    far.po_number = Some("PO-9".to_string());
    let far_result = score_invoice(&store, &settings, &far, "tester").await.unwrap();
    assert!(!far_result.reason_codes.contains(&"SAME_PO_NEAR_TOTAL".to_string()));
}

#[tokio::test]
async fn scenario_cold_vendor_dampens_anomaly_probability() {
    let store = InMemoryStore::new("default");
    let settings = settings();
    store.seed_baseline(VendorAmountBaseline {
        tenant_id: "default".to_string(),
        vendor_id: "vendor-1".to_string(),
        mean_total: 100.0,
        std_total: 10.0,
        sample_count: 2,
        updated_at: Utc::now(),
    });

    let invoice = invoice("I1", "INV-1", dec!(130.00), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    let result = score_invoice(&store, &settings, &invoice, "tester").await.unwrap();

    assert!(result.risk_score < 100.0);
}

#[tokio::test]
async fn scenario_zero_thresholds_always_hold() {
    let store = InMemoryStore::new("default");
    let mut settings = settings();
    settings.hold_threshold_default = 0.0;
    settings.review_threshold_default = 0.0;

    let invoice = invoice("I1", "INV-1", dec!(100.00), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    let result = score_invoice(&store, &settings, &invoice, "tester").await.unwrap();

    assert_eq!(result.decision, sieve_core::model::Decision::Hold);
}

#[tokio::test]
async fn scenario_tenant_config_override_takes_precedence_over_default_threshold() {
    let store = InMemoryStore::new("default");
    store.seed_config("default", "T_hold", 0.0);
    store.seed_config("default", "T_review", 0.0);
    let settings = settings();

    let invoice = invoice("I1", "INV-1", dec!(100.00), NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    let result = score_invoice(&store, &settings, &invoice, "tester").await.unwrap();

    assert_eq!(result.decision, sieve_core::model::Decision::Hold);
}

#[tokio::test]
async fn scenario_fresh_invoice_with_no_history_passes() {
    let store = InMemoryStore::new("default");
    let settings = settings();

    let invoice = invoice("I1", "INV-1", dec!(100.00), NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
    let result = score_invoice(&store, &settings, &invoice, "tester").await.unwrap();

    assert_eq!(result.decision, sieve_core::model::Decision::Pass);
    assert!(result.reason_codes.is_empty());
    assert!(result.top_matches.is_empty());
}

#[tokio::test]
async fn replay_of_identical_payload_appends_a_new_decision_row() {
    let store = InMemoryStore::new("default");
    let settings = settings();

    let invoice = invoice("I1", "INV-1", dec!(100.00), NaiveDate::from_ymd_opt(2024, 8, 1).unwrap());
    score_invoice(&store, &settings, &invoice, "tester").await.unwrap();
    score_invoice(&store, &settings, &invoice, "tester").await.unwrap();

    let lines = store.fetch_lines("default", "I1").await.unwrap();
    assert_eq!(lines.len(), 1, "lines must be replaced, not duplicated");

    let latest = store.latest_decision("default", "I1").await.unwrap();
    assert_eq!(latest.invoice_id, "I1");
}
