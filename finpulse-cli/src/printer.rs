//! Plain-text rendering for command output.

use chrono::{NaiveDate, TimeDelta};
use finpulse_edgar::dates::{expected_filing_periods, filing_period_description, parse_date};
use finpulse_edgar::{CompanyInfo, FilingRef};
use finpulse_report::ClearedCache;

/// A filing counts toward a calendar quarter when its period ends this close to it.
const QUARTER_END_TOLERANCE_DAYS: i64 = 14;

pub fn company_info(info: &CompanyInfo) -> String {
    let mut out = format!("{} (CIK {})\n", info.name, info.cik);
    if !info.tickers.is_empty() {
        out.push_str(&format!("  Tickers:         {}\n", info.tickers.join(", ")));
    }
    if !info.exchanges.is_empty() {
        out.push_str(&format!("  Exchanges:       {}\n", info.exchanges.join(", ")));
    }
    if let Some(sic) = &info.sic_description {
        out.push_str(&format!("  Industry:        {sic}\n"));
    }
    if let Some(fye) = &info.fiscal_year_end {
        out.push_str(&format!("  Fiscal year end: {}\n", fiscal_year_end(fye)));
    }
    out
}

/// `"0928"` → `"09-28"`; other shapes are shown as given.
fn fiscal_year_end(raw: &str) -> String {
    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}", &raw[..2], &raw[2..])
    } else {
        raw.to_string()
    }
}

pub fn filings_table(filings: &[FilingRef]) -> String {
    if filings.is_empty() {
        return "No filings found.\n".to_string();
    }
    let mut out = format!("{:<6} {:<12} {:<12} {:<9} {}\n", "Form", "Filed", "Period", "Quarter", "Accession");
    for filing in filings {
        let quarter = filing_period_description(&filing.report_date).unwrap_or_else(|_| "-".to_string());
        out.push_str(&format!(
            "{:<6} {:<12} {:<12} {:<9} {}\n",
            filing.form, filing.filing_date, filing.report_date, quarter, filing.accession_number
        ));
    }
    out
}

/// Filings whose period end falls inside `[start, end]`.
pub fn within_range(filings: Vec<FilingRef>, (start, end): (NaiveDate, NaiveDate)) -> Vec<FilingRef> {
    filings
        .into_iter()
        .filter(|f| parse_date(&f.report_date).is_ok_and(|d| d >= start && d <= end))
        .collect()
}

/// Each calendar quarter end of `year` paired with the filing covering it, if any.
pub fn quarter_coverage(year: i32, filings: &[FilingRef]) -> Vec<(NaiveDate, Option<&FilingRef>)> {
    let tolerance = TimeDelta::days(QUARTER_END_TOLERANCE_DAYS);
    expected_filing_periods(year)
        .into_iter()
        .map(|quarter_end| {
            let covering = filings.iter().find(|f| {
                parse_date(&f.report_date)
                    .is_ok_and(|d| (d - quarter_end).abs() <= tolerance)
            });
            (quarter_end, covering)
        })
        .collect()
}

pub fn coverage_table(year: i32, filings: &[FilingRef]) -> String {
    let mut out = format!("Quarter coverage for {year}:\n");
    for (quarter_end, filing) in quarter_coverage(year, filings) {
        let status = match filing {
            Some(f) => format!("{} filed {}", f.form, f.filing_date),
            None => "no filing".to_string(),
        };
        out.push_str(&format!("  {quarter_end}  {status}\n"));
    }
    out
}

pub fn cleared(ticker: Option<&str>, cleared: ClearedCache) -> String {
    let scope = ticker.map(|t| t.trim().to_uppercase()).unwrap_or_else(|| "all companies".to_string());
    format!(
        "Cleared cache for {scope}: {} in-memory index(es), {} file(s) removed\n",
        cleared.indexes_dropped, cleared.files_removed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filing(period: &str, filed: &str) -> FilingRef {
        FilingRef {
            form: "10-Q".to_string(),
            filing_date: filed.to_string(),
            report_date: period.to_string(),
            accession_number: format!("0000320193-{}", filed.replace('-', "")),
            primary_document: "aapl.htm".to_string(),
        }
    }

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    #[test]
    fn info_formats_fiscal_year_end() {
        let info = CompanyInfo {
            cik: "0000320193".to_string(),
            name: "Apple Inc.".to_string(),
            tickers: vec!["AAPL".to_string()],
            exchanges: vec![],
            sic_description: None,
            fiscal_year_end: Some("0928".to_string()),
        };
        let text = company_info(&info);
        assert!(text.starts_with("Apple Inc. (CIK 0000320193)"));
        assert!(text.contains("Fiscal year end: 09-28"));
        assert!(!text.contains("Exchanges"));
    }

    #[test]
    fn table_labels_quarters() {
        let table = filings_table(&[filing("2024-06-29", "2024-08-02")]);
        assert!(table.lines().nth(1).unwrap().contains("Q2 2024"));
        assert_eq!(filings_table(&[]), "No filings found.\n");
    }

    #[test]
    fn range_filter_is_inclusive() {
        let filings = vec![filing("2024-06-29", "2024-08-02"), filing("2023-12-30", "2024-02-02")];
        let kept = within_range(filings, (date("2024-01-01"), date("2024-06-29")));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].report_date, "2024-06-29");
    }

    #[test]
    fn fiscal_quarters_near_calendar_ends_count() {
        let filings = vec![filing("2024-03-30", "2024-05-03"), filing("2024-06-29", "2024-08-02")];
        let coverage = quarter_coverage(2024, &filings);
        assert_eq!(coverage.len(), 4);
        assert!(coverage[0].1.is_some());
        assert!(coverage[1].1.is_some());
        assert!(coverage[2].1.is_none());
        assert!(coverage_table(2024, &filings).contains("2024-12-31  no filing"));
    }

    #[test]
    fn cleared_message() {
        let summary = ClearedCache { indexes_dropped: 1, files_removed: 2 };
        assert_eq!(
            cleared(Some("aapl"), summary),
            "Cleared cache for AAPL: 1 in-memory index(es), 2 file(s) removed\n"
        );
    }
}
