//! Narrative synthesis: prompt assembly, citation handling and fallback.
//!
//! The synthesizer never fails. A generation error turns into a deterministic
//! fallback text so a report is always produced.

use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};

use finpulse_edgar::{KpiMap, format_currency};
use finpulse_rag::RetrievalResult;
use regex::Regex;
use tracing::{error, info};

use crate::generation::GenerationService;

/// Citations used when retrieval produced no excerpts.
pub const FALLBACK_CITATIONS: [(&str, &str); 2] = [
    (
        "Analysis based on SEC EDGAR company facts and financial metrics.",
        "https://www.sec.gov/edgar/sec-api-documentation",
    ),
    (
        "Data sourced from official SEC filings and company submissions.",
        "https://www.sec.gov/edgar",
    ),
];

const EXCERPT_CHARS: usize = 500;
const ERROR_CHARS: usize = 100;

/// A heading line that opens a sources or references list.
static SOURCES_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*)?[ \t]*(?:sources|references|citations)[ \t]*:?[ \t]*(?:\*\*)?[ \t]*:?[ \t]*$")
        .expect("unreachable error: invalid sources heading pattern")
});

/// A line that can appear inside a sources list.
static SOURCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:$|[-*•]|\d+[.)]|\[S\d+\])")
        .expect("unreachable error: invalid source line pattern")
});

/// A numbered citation: `[S1]` and the URL it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub key: String,
    pub url: String,
}

/// Turns KPIs and retrieved excerpts into a cited narrative.
pub struct NarrativeSynthesizer {
    service: Arc<dyn GenerationService>,
}

impl NarrativeSynthesizer {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    /// Answer `query` from `kpis` and `results`.
    ///
    /// On success the model's own trailing sources list (if any) is replaced
    /// by exactly one canonical `**Sources:**` section. On failure the
    /// deterministic fallback text is returned instead.
    pub async fn summarize(&self, kpis: &KpiMap, results: &[RetrievalResult], query: &str) -> String {
        let prompt = build_prompt(kpis, results, query);
        let citations = citations(results);

        match self.service.complete(&prompt).await {
            Ok(text) => {
                info!(
                    provider = self.service.name(),
                    kpi_count = kpis.len(),
                    source_count = citations.len(),
                    "generated narrative"
                );
                let mut narrative = strip_sources_block(&text).trim_end().to_string();
                narrative.push_str(&sources_section(&citations));
                narrative
            }
            Err(e) => {
                error!(provider = self.service.name(), error = %e, "narrative generation failed");
                fallback_narrative(query, kpis.len(), results.len(), &e.to_string())
            }
        }
    }
}

/// Citation keys in retrieval order, or the two fixed fallbacks when there
/// are no results.
pub fn citations(results: &[RetrievalResult]) -> Vec<Citation> {
    if results.is_empty() {
        return FALLBACK_CITATIONS
            .iter()
            .enumerate()
            .map(|(i, (_, url))| Citation { key: format!("[S{}]", i + 1), url: url.to_string() })
            .collect();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| Citation { key: format!("[S{}]", i + 1), url: r.source_url.clone() })
        .collect()
}

/// The generation prompt. Deterministic for identical inputs.
pub fn build_prompt(kpis: &KpiMap, results: &[RetrievalResult], query: &str) -> String {
    let mut kpi_summary = String::from("Key Financial Metrics:\n");
    for (name, kpi) in kpis {
        let _ = writeln!(
            kpi_summary,
            "- {name}: {} (as of {}, {})",
            group_thousands(kpi.value),
            kpi.period,
            kpi.filing_form
        );
    }

    let mut source_context = String::from("Relevant Financial Information:\n");
    if results.is_empty() {
        for (i, (description, _)) in FALLBACK_CITATIONS.iter().enumerate() {
            let _ = writeln!(source_context, "[S{}] {description}", i + 1);
        }
    } else {
        for (i, result) in results.iter().enumerate() {
            let excerpt: String = result.text.chars().take(EXCERPT_CHARS).collect();
            let _ = write!(source_context, "[S{}] {excerpt}...\n\n", i + 1);
        }
    }

    format!(
        "You are a financial analyst writing a response to a specific investor question. \
Use the following information to directly address the user's query with inline citations.

USER'S QUESTION: \"{query}\"

{kpi_summary}
{source_context}
Requirements:
1. DIRECTLY ANSWER the user's specific question in 5-7 sentences
2. Include inline citations like [S1], [S2] when referencing specific information
3. Use the exact KPI values provided to support your analysis
4. Be objective and factual, but address the specific concern/query
5. If the question is about investment decisions, provide analysis but include appropriate disclaimers
6. Focus on information relevant to answering the user's specific question

Financial Analysis Response:
"
    )
}

/// Markdown KPI table, or `"No KPI data available."`.
pub fn kpi_table(kpis: &KpiMap) -> String {
    if kpis.is_empty() {
        return "No KPI data available.".to_string();
    }

    let mut table = String::from("| Metric | Value | Period | Filing |\n");
    table.push_str("|--------|-------|--------|--------|\n");
    for (name, kpi) in kpis {
        let _ = writeln!(
            table,
            "| {name} | {} | {} | {} |",
            format_currency(kpi.value),
            kpi.period,
            kpi.filing_form
        );
    }
    table
}

fn sources_section(citations: &[Citation]) -> String {
    let mut section = String::from("\n\n**Sources:**\n");
    for citation in citations {
        let _ = writeln!(section, "- {}: {}", citation.key, citation.url);
    }
    section
}

/// Drop a trailing sources list the model wrote itself. Only a heading whose
/// remaining lines all look like list entries is treated as one.
fn strip_sources_block(text: &str) -> &str {
    SOURCES_HEADING
        .find_iter(text)
        .find(|m| text[m.end()..].lines().all(|line| SOURCE_LINE.is_match(line)))
        .map_or(text, |m| &text[..m.start()])
}

fn fallback_narrative(query: &str, kpi_count: usize, source_count: usize, error: &str) -> String {
    let error: String = error.chars().take(ERROR_CHARS).collect();
    format!(
        "Analysis for query: '{query}'\n\n\
         Based on {kpi_count} key metrics and {source_count} relevant documents. \
         Key metrics include revenue, net income, and cash position. \
         \n\n**Note**: AI analysis unavailable due to API error: {error}... \
         Please refer to the source documents for detailed analysis."
    )
}

/// `1234567.891` → `"1,234,567.89"`.
fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}
