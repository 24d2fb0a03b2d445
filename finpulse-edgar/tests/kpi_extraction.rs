//! KPI extraction over a company-facts payload shaped like EDGAR's.

use chrono::NaiveDate;
use finpulse_edgar::{CompanyFacts, KpiExtractor, TRAILING_REVENUE, format_currency};
use serde_json::json;

fn apple_facts() -> CompanyFacts {
    CompanyFacts::from_value(json!({
        "cik": 320193,
        "entityName": "Apple Inc.",
        "facts": {
            "dei": {"EntityCommonStockSharesOutstanding": {"units": {"shares": [
                {"val": 15116786000.0, "end": "2024-10-18", "form": "10-K", "filed": "2024-11-01"}
            ]}}},
            "us-gaap": {
                "Revenues": {"label": "Revenues", "units": {"USD": [
                    {"val": 89498000000.0, "end": "2024-09-28", "form": "10-Q", "filed": "2024-10-31"}
                ]}},
                "NetIncomeLoss": {"units": {"USD": [
                    {"val": 22956000000.0, "end": "2024-09-28", "form": "10-Q", "filed": "2024-10-31"}
                ]}},
                "EarningsPerShareDiluted": {"units": {"USD/shares": [
                    {"val": 1.53, "end": "2024-09-28", "form": "10-Q", "filed": "2024-10-31"}
                ]}}
            }
        }
    }))
    .unwrap()
}

fn as_of(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

#[test]
fn recent_quarter_is_extracted() {
    let kpis = KpiExtractor::new(as_of("2024-11-01")).extract_kpis(&apple_facts());

    assert_eq!(kpis.len(), 3);
    assert_eq!(kpis["Revenues"].value, 89498000000.0);
    assert_eq!(kpis["NetIncomeLoss"].value, 22956000000.0);
    assert_eq!(kpis["EarningsPerShareDiluted"].value, 1.53);
    assert_eq!(format_currency(kpis["Revenues"].value), "$89.50B");
}

#[test]
fn stale_quarter_falls_outside_window() {
    let extractor = KpiExtractor::new(as_of("2026-10-01"));
    assert!(extractor.extract_kpis(&apple_facts()).is_empty());

    let widened = extractor.with_lookback_months(36);
    assert_eq!(widened.extract_kpis(&apple_facts()).len(), 3);
}

#[test]
fn single_quarter_makes_a_trailing_total() {
    let record = KpiExtractor::new(as_of("2024-11-01"))
        .with_trailing_quarters(4)
        .trailing_revenue(&apple_facts())
        .unwrap();
    assert_eq!(record.name, TRAILING_REVENUE);
    assert_eq!(record.value, 89498000000.0);
    assert_eq!(record.period, "2024-09-28");
}

#[test]
fn empty_payload_is_not_an_error() {
    let facts = CompanyFacts::from_value(json!({})).unwrap();
    assert!(KpiExtractor::default().extract_kpis(&facts).is_empty());
}
