//! KPI extraction from XBRL company facts.
//!
//! [`KpiExtractor`] picks the latest quarterly observation of each recognized
//! metric inside a trailing window ending at a reference date, and can sum the
//! most recent quarters of revenue into a derived `TrailingRevenue` record.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use crate::dates::{months_before, parse_date};
use crate::model::{CompanyFacts, FactObservation, KpiMap, KpiRecord};

/// Metrics extracted by default, with their preferred unit.
pub const KPI_METRICS: &[(&str, &str)] = &[
    ("Revenues", "USD"),
    ("NetIncomeLoss", "USD"),
    ("EarningsPerShareDiluted", "USD/shares"),
    ("CashAndCashEquivalentsAtCarryingValue", "USD"),
    ("LongTermDebtNoncurrent", "USD"),
];

/// Revenue concepts tried in order for trailing revenue.
pub const REVENUE_CONCEPTS: &[&str] = &[
    "Revenues",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "SalesRevenueNet",
    "RevenueFromContractWithCustomerIncludingAssessedTax",
];

/// Name of the derived trailing revenue record.
pub const TRAILING_REVENUE: &str = "TrailingRevenue";

const DEFAULT_LOOKBACK_MONTHS: u32 = 24;
const DEFAULT_TRAILING_QUARTERS: usize = 3;
const QUARTERLY_FORM: &str = "10-Q";
const QUARTER_DAYS: std::ops::RangeInclusive<i64> = 80..=100;

/// Extracts normalized KPI records from company facts.
#[derive(Debug, Clone)]
pub struct KpiExtractor {
    as_of: NaiveDate,
    lookback_months: u32,
    trailing_quarters: usize,
}

impl Default for KpiExtractor {
    fn default() -> Self {
        Self::new(Utc::now().date_naive())
    }
}

impl KpiExtractor {
    /// Create an extractor whose window ends at `as_of`.
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
            trailing_quarters: DEFAULT_TRAILING_QUARTERS,
        }
    }

    /// Set how many months before the reference date observations are kept.
    pub fn with_lookback_months(mut self, months: u32) -> Self {
        self.lookback_months = months;
        self
    }

    /// Set how many quarters trailing revenue sums.
    pub fn with_trailing_quarters(mut self, quarters: usize) -> Self {
        self.trailing_quarters = quarters;
        self
    }

    /// The reference date.
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    fn extract_window<'a>(
        &self,
        observations: &'a [FactObservation],
    ) -> impl Iterator<Item = (NaiveDate, &'a FactObservation)> + use<'a> {
        in_window(observations, months_before(self.as_of, self.lookback_months))
    }

    /// Extract every recognized metric present in `facts`.
    ///
    /// Metrics without a surviving observation are omitted; an empty payload
    /// yields an empty map.
    pub fn extract_kpis(&self, facts: &CompanyFacts) -> KpiMap {
        let mut kpis = KpiMap::new();
        if facts.facts.get("us-gaap").is_none() {
            if !facts.is_empty() {
                warn!("company facts carry no us-gaap taxonomy");
            }
            return kpis;
        }

        for (metric, preferred_unit) in KPI_METRICS {
            let Some(observations) = observations_for(facts, metric, preferred_unit) else {
                debug!(metric, "metric absent from company facts");
                continue;
            };
            let latest = self
                .extract_window(observations)
                .fold(None::<(NaiveDate, &FactObservation)>, |best, candidate| match best {
                    Some((end, _)) if candidate.0 < end => best,
                    _ => Some(candidate),
                });

            if let Some((end, obs)) = latest {
                kpis.insert(metric.to_string(), record(metric, obs, end));
            }
        }

        debug!(kpi_count = kpis.len(), as_of = %self.as_of, "extracted KPIs");
        kpis
    }

    /// Sum the most recent quarterly revenue observations.
    ///
    /// Returns `None` when no revenue concept has a surviving quarter or the
    /// sum is not positive.
    pub fn trailing_revenue(&self, facts: &CompanyFacts) -> Option<KpiRecord> {
        for concept in REVENUE_CONCEPTS {
            let Some(observations) = observations_for(facts, concept, "USD") else {
                continue;
            };

            let mut by_end: BTreeMap<NaiveDate, &FactObservation> = BTreeMap::new();
            for (end, obs) in self.extract_window(observations) {
                if is_quarter_length(obs, end) {
                    by_end.insert(end, obs);
                }
            }
            if by_end.is_empty() {
                continue;
            }

            let quarters: Vec<(NaiveDate, &FactObservation)> =
                by_end.into_iter().rev().take(self.trailing_quarters).collect();
            let total: f64 = quarters.iter().filter_map(|(_, obs)| obs.val).sum();
            if total <= 0.0 {
                return None;
            }

            let period = quarters
                .iter()
                .rev()
                .map(|(end, _)| end.format("%Y-%m-%d").to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let filed_date =
                quarters.iter().filter_map(|(_, obs)| obs.filed.clone()).max().unwrap_or_default();

            debug!(concept, quarters = quarters.len(), total, "aggregated trailing revenue");
            return Some(KpiRecord {
                name: TRAILING_REVENUE.to_string(),
                value: total,
                period,
                filing_form: QUARTERLY_FORM.to_string(),
                filed_date,
            });
        }
        None
    }
}

/// Quarterly observations with a value and a parsed `end` on or after `window_start`.
fn in_window(
    observations: &[FactObservation],
    window_start: NaiveDate,
) -> impl Iterator<Item = (NaiveDate, &FactObservation)> {
    observations.iter().filter_map(move |obs| {
        let form = obs.form.as_deref().unwrap_or_default();
        if !form.starts_with(QUARTERLY_FORM) || obs.val.is_none() {
            return None;
        }
        let raw_end = obs.end.as_deref()?;
        let end = match parse_date(raw_end) {
            Ok(end) => end,
            Err(e) => {
                debug!(end = raw_end, error = %e, "skipping observation with unparsable end");
                return None;
            }
        };
        (end >= window_start).then_some((end, obs))
    })
}

/// Observations for `concept` in the preferred unit, else USD, else
/// USD/shares, else the first unit present.
fn observations_for<'a>(
    facts: &'a CompanyFacts,
    concept: &str,
    preferred_unit: &str,
) -> Option<&'a [FactObservation]> {
    let units = &facts.us_gaap(concept)?.units;
    [preferred_unit, "USD", "USD/shares"]
        .iter()
        .find_map(|unit| units.get(*unit))
        .or_else(|| units.values().next())
        .map(Vec::as_slice)
}

fn is_quarter_length(obs: &FactObservation, end: NaiveDate) -> bool {
    match obs.start.as_deref().map(parse_date) {
        None => true,
        Some(Ok(start)) => QUARTER_DAYS.contains(&(end - start).num_days()),
        Some(Err(_)) => false,
    }
}

fn record(metric: &str, obs: &FactObservation, end: NaiveDate) -> KpiRecord {
    KpiRecord {
        name: metric.to_string(),
        value: obs.val.unwrap_or_default(),
        period: end.format("%Y-%m-%d").to_string(),
        filing_form: obs.form.clone().unwrap_or_default(),
        filed_date: obs.filed.clone().unwrap_or_default(),
    }
}

/// Format a value as `$89.50B`, `$1.23M`, `$4.56K` or `$1.53`.
pub fn format_currency(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if magnitude >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if magnitude >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    fn facts(value: serde_json::Value) -> CompanyFacts {
        CompanyFacts::from_value(value).unwrap()
    }

    fn apple_facts() -> CompanyFacts {
        facts(json!({"facts": {"us-gaap": {
            "Revenues": {"units": {"USD": [
                {"val": 85777000000.0, "start": "2024-03-31", "end": "2024-06-29", "form": "10-Q", "filed": "2024-08-02"},
                {"val": 89498000000.0, "start": "2024-06-30", "end": "2024-09-28", "form": "10-Q", "filed": "2024-10-31"},
                {"val": 391035000000.0, "start": "2023-10-01", "end": "2024-09-28", "form": "10-K", "filed": "2024-11-01"}
            ]}},
            "NetIncomeLoss": {"units": {"USD": [
                {"val": 22956000000.0, "end": "2024-09-28", "form": "10-Q", "filed": "2024-10-31"}
            ]}},
            "EarningsPerShareDiluted": {"units": {"USD/shares": [
                {"val": 1.53, "end": "2024-09-28", "form": "10-Q", "filed": "2024-10-31"}
            ]}}
        }}}))
    }

    #[test]
    fn empty_facts_yield_empty_map() {
        let extractor = KpiExtractor::new(date("2024-11-01"));
        assert!(extractor.extract_kpis(&CompanyFacts::default()).is_empty());
        assert!(extractor.trailing_revenue(&CompanyFacts::default()).is_none());
    }

    #[test]
    fn picks_latest_quarterly_observation_in_window() {
        let kpis = KpiExtractor::new(date("2024-11-01")).extract_kpis(&apple_facts());

        let revenue = &kpis["Revenues"];
        assert_eq!(revenue.value, 89498000000.0);
        assert_eq!(revenue.period, "2024-09-28");
        assert_eq!(revenue.filing_form, "10-Q");
        assert_eq!(revenue.filed_date, "2024-10-31");
        assert_eq!(kpis["EarningsPerShareDiluted"].value, 1.53);
        assert!(!kpis.contains_key("LongTermDebtNoncurrent"));

        let names: Vec<&str> = kpis.keys().map(String::as_str).collect();
        assert_eq!(names, ["Revenues", "NetIncomeLoss", "EarningsPerShareDiluted"]);
    }

    #[test]
    fn observations_outside_window_are_dropped() {
        let kpis = KpiExtractor::new(date("2027-01-01")).extract_kpis(&apple_facts());
        assert!(kpis.is_empty());
    }

    #[test]
    fn ties_on_end_date_take_the_last_observation() {
        let facts = facts(json!({"facts": {"us-gaap": {"NetIncomeLoss": {"units": {"USD": [
            {"val": 1.0, "end": "2024-09-28", "form": "10-Q", "filed": "2024-10-31"},
            {"val": 2.0, "end": "2024-09-28", "form": "10-Q/A", "filed": "2024-12-01"},
            {"val": 3.0, "end": "not-a-date", "form": "10-Q"}
        ]}}}}}));
        let kpis = KpiExtractor::new(date("2024-12-31")).extract_kpis(&facts);
        assert_eq!(kpis["NetIncomeLoss"].value, 2.0);
    }

    #[test]
    fn falls_back_to_first_unit_present() {
        let facts = facts(json!({"facts": {"us-gaap": {"Revenues": {"units": {"EUR": [
            {"val": 5.0, "end": "2024-09-28", "form": "10-Q", "filed": "2024-10-31"}
        ]}}}}}));
        let kpis = KpiExtractor::new(date("2024-11-01")).extract_kpis(&facts);
        assert_eq!(kpis["Revenues"].value, 5.0);
    }

    #[test]
    fn trailing_revenue_sums_quarter_length_periods() {
        let record = KpiExtractor::new(date("2024-11-01")).trailing_revenue(&apple_facts()).unwrap();
        assert_eq!(record.name, TRAILING_REVENUE);
        assert_eq!(record.value, 85777000000.0 + 89498000000.0);
        assert_eq!(record.period, "2024-06-29, 2024-09-28");
        assert_eq!(record.filed_date, "2024-10-31");
    }

    #[test]
    fn trailing_revenue_tries_alternative_concepts() {
        let facts = facts(json!({"facts": {"us-gaap": {
            "RevenueFromContractWithCustomerExcludingAssessedTax": {"units": {"USD": [
                {"val": 10.0, "end": "2024-03-31", "form": "10-Q"},
                {"val": 20.0, "end": "2024-06-30", "form": "10-Q"},
                {"val": 30.0, "end": "2024-09-30", "form": "10-Q"},
                {"val": 40.0, "end": "2023-12-31", "form": "10-Q"}
            ]}}
        }}}));
        let record = KpiExtractor::new(date("2024-11-01")).trailing_revenue(&facts).unwrap();
        assert_eq!(record.value, 60.0);
        assert_eq!(record.period, "2024-03-31, 2024-06-30, 2024-09-30");
    }

    #[test]
    fn formats_currency_by_magnitude() {
        assert_eq!(format_currency(89_498_000_000.0), "$89.50B");
        assert_eq!(format_currency(1_234_567.0), "$1.23M");
        assert_eq!(format_currency(4_560.0), "$4.56K");
        assert_eq!(format_currency(1.53), "$1.53");
        assert_eq!(format_currency(-2_500_000_000.0), "$-2.50B");
    }
}
