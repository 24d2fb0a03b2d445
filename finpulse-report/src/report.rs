//! The report aggregate handed to presentation layers.

use chrono::{DateTime, NaiveDate, Utc};
use finpulse_edgar::{FilingScope, KpiMap};
use serde::Serialize;

/// A labelled link backing part of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCitation {
    pub label: String,
    pub url: String,
    /// `1.0` for filing metadata, the relevance score for retrieved
    /// excerpts, `0.0` for the fixed fallback entries.
    pub score: f32,
}

/// Everything produced for one `(ticker, scope, query)` request.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub ticker: String,
    pub cik: String,
    pub scope: FilingScope,
    pub query: String,
    pub kpis: KpiMap,
    /// Markdown rendering of `kpis`.
    pub kpi_table: String,
    pub narrative: String,
    /// The analyzed filings, newest first.
    pub sources: Vec<SourceCitation>,
    /// The `[S{n}]` citations the narrative refers to.
    pub citations: Vec<SourceCitation>,
    pub filings_analyzed: usize,
    /// Reference date of the KPI window.
    pub as_of: NaiveDate,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Pretty-printed JSON for machine consumers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Markdown rendering: heading, KPI table, narrative and sources.
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "# {} {} report\n\n_Query: {} | as of {} | {} filings analyzed_\n\n",
            self.ticker, self.scope, self.query, self.as_of, self.filings_analyzed
        );
        out.push_str("## Key metrics\n\n");
        out.push_str(&self.kpi_table);
        out.push_str("\n\n## Analysis\n\n");
        out.push_str(self.narrative.trim_end());
        out.push_str("\n\n## Filings\n\n");
        for source in &self.sources {
            out.push_str(&format!("- [{}]({})\n", source.label, source.url));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use finpulse_edgar::KpiRecord;

    use super::*;

    fn report() -> Report {
        let mut kpis = KpiMap::new();
        kpis.insert(
            "Revenues".to_string(),
            KpiRecord {
                name: "Revenues".to_string(),
                value: 94_930_000_000.0,
                period: "2024-09-28".to_string(),
                filing_form: "10-Q".to_string(),
                filed_date: "2024-11-01".to_string(),
            },
        );
        Report {
            ticker: "AAPL".to_string(),
            cik: "0000320193".to_string(),
            scope: FilingScope::Quarterly,
            query: "revenue growth".to_string(),
            kpis,
            kpi_table: "| Metric | Value |".to_string(),
            narrative: "Revenue grew [S1].\n".to_string(),
            sources: vec![SourceCitation {
                label: "10-Q filed 2024-08-02 (period 2024-06-29)".to_string(),
                url: "https://www.sec.gov/Archives/edgar/data/320193/000032019324000081/aapl-20240629.htm"
                    .to_string(),
                score: 1.0,
            }],
            citations: Vec::new(),
            filings_analyzed: 1,
            as_of: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
            generated_at: Utc.with_ymd_and_hms(2024, 11, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn json_uses_wire_names() {
        let value: serde_json::Value = serde_json::from_str(&report().to_json().unwrap()).unwrap();
        assert_eq!(value["scope"], "10-Q");
        assert_eq!(value["kpis"]["Revenues"]["form"], "10-Q");
        assert_eq!(value["kpis"]["Revenues"]["filed"], "2024-11-01");
        assert_eq!(value["as_of"], "2024-11-01");
    }

    #[test]
    fn markdown_lists_filings() {
        let markdown = report().to_markdown();
        assert!(markdown.starts_with("# AAPL 10-Q report"));
        assert!(markdown.contains("Revenue grew [S1]."));
        assert!(markdown.contains("- [10-Q filed 2024-08-02 (period 2024-06-29)](https://www.sec.gov/"));
    }
}
