//! Keyword scoring with synonym expansion.
//!
//! This is the baseline scoring strategy: it needs no model, and its scores
//! are reproducible across runs.

use std::collections::BTreeSet;

/// Investor-vocabulary synonym groups. Expansion is bidirectional: a query
/// token matching either the head word or any member pulls in the whole group.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("sell", &["divest", "exit", "liquidate", "dispose"]),
    ("buy", &["purchase", "invest", "acquire", "add"]),
    ("hold", &["maintain", "keep", "retain"]),
    ("performance", &["results", "earnings", "revenue", "profit"]),
    ("growth", &["increase", "expansion", "rise", "gain"]),
    ("decline", &["decrease", "drop", "fall", "reduction"]),
    ("debt", &["borrowings", "liabilities", "notes", "obligations"]),
    ("cash", &["liquidity", "equivalents", "reserves"]),
    ("risk", &["uncertainty", "exposure", "volatility", "threat"]),
    ("opportunity", &["potential", "prospect", "upside"]),
];

/// Terms that mark a chunk as coming from a financial section.
const FINANCIAL_MARKERS: &[&str] =
    &["financial", "revenue", "income", "cash", "debt", "balance", "statement"];

/// A query prepared for lexical scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedQuery {
    original: Vec<String>,
    synonyms: Vec<String>,
}

impl ExpandedQuery {
    /// Lower-case and whitespace-tokenize `query`, then expand it through the
    /// synonym table.
    pub fn parse(query: &str) -> Self {
        let lowered = query.to_lowercase();
        let mut original: Vec<String> = Vec::new();
        for token in lowered.split_whitespace() {
            if !original.iter().any(|t| t == token) {
                original.push(token.to_string());
            }
        }

        let mut expanded: BTreeSet<&str> = BTreeSet::new();
        for token in &original {
            for (head, group) in SYNONYMS {
                if token == head || group.contains(&token.as_str()) {
                    expanded.insert(*head);
                    expanded.extend(group.iter().copied());
                }
            }
        }

        let synonyms = expanded
            .into_iter()
            .filter(|s| !original.iter().any(|t| t == s))
            .map(str::to_string)
            .collect();

        Self { original, synonyms }
    }

    /// Tokens the user actually typed.
    pub fn original_tokens(&self) -> &[String] {
        &self.original
    }

    /// Tokens added by synonym expansion, excluding the original tokens.
    pub fn synonym_tokens(&self) -> &[String] {
        &self.synonyms
    }

    /// Size of the full expanded token set.
    pub fn expanded_len(&self) -> usize {
        self.original.len() + self.synonyms.len()
    }

    /// Whether the query contained no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Raw integer score of `text` against this query.
    ///
    /// +2 per original token found as a substring, +1 per synonym found,
    /// +1 if any financial-section marker is present.
    pub fn raw_score(&self, text: &str) -> u32 {
        let lowered = text.to_lowercase();
        let mut score = 0;
        for token in &self.original {
            if lowered.contains(token.as_str()) {
                score += 2;
            }
        }
        for token in &self.synonyms {
            if lowered.contains(token.as_str()) {
                score += 1;
            }
        }
        if FINANCIAL_MARKERS.iter().any(|m| lowered.contains(m)) {
            score += 1;
        }
        score
    }

    /// Normalize a raw score into `[0, 1]`.
    pub fn normalize(&self, raw: u32) -> f32 {
        let denominator = (2 * self.expanded_len() + 1) as f32;
        (raw as f32 / denominator).clamp(0.0, 1.0)
    }
}
