//! Plain-text extraction from filing HTML.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

/// Elements whose text is never part of the filing narrative.
const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("unreachable error: invalid space pattern"));

/// Revenue line patterns, most specific first. Amounts need a thousands
/// separator so fiscal years are not mistaken for values.
static REVENUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)total net sales\s*\$?\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?)",
        r"(?i)total net revenues?\s*\$?\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?)",
        r"(?i)total revenues?\s*\$?\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?)",
        r"(?i)net revenues?\s*\$?\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?)",
        r"(?i)revenues?\s*\$\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?)",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("unreachable error: invalid revenue pattern"))
    .collect()
});

/// Strip markup from filing HTML and collapse whitespace.
///
/// Entities are decoded by the HTML parser; `script`, `style` and
/// `noscript` content and comments are dropped.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 2);
    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else { continue };
        let skipped = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name()))
            .is_some_and(|name| SKIPPED_ELEMENTS.contains(&name));
        if !skipped {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// A revenue figure found in filing text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRevenue {
    /// Value in dollars, after applying the document's unit scale.
    pub value: f64,
    /// The matched text.
    pub matched: String,
}

/// Find the first revenue figure in plain filing text.
///
/// Values are scaled by 1,000,000 when the text says amounts are "in
/// millions" and by 1,000 for "in thousands".
pub fn extract_revenue_from_text(text: &str) -> Option<TextRevenue> {
    let lower = text.to_lowercase();
    let scale = if lower.contains("in millions") {
        1e6
    } else if lower.contains("in thousands") {
        1e3
    } else {
        1.0
    };

    REVENUE_PATTERNS.iter().find_map(|pattern| {
        pattern.captures_iter(text).find_map(|caps| {
            let amount: f64 = caps[1].replace(',', "").parse().ok()?;
            (amount > 0.0)
                .then(|| TextRevenue { value: amount * scale, matched: caps[0].to_string() })
        })
    })
}
