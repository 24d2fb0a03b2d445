//! Narrative synthesis against scripted generation services.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use finpulse_edgar::{KpiMap, KpiRecord};
use finpulse_model::{GenerationService, ModelError, NarrativeSynthesizer, Result};
use finpulse_rag::RetrievalResult;

/// Replies with a fixed answer and records every prompt it sees.
struct ScriptedService {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self { reply: Ok(text.to_string()), prompts: Mutex::new(Vec::new()) })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self { reply: Err(message.to_string()), prompts: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(|message| ModelError::RequestError {
            provider: "scripted".into(),
            message,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn kpis() -> KpiMap {
    let mut kpis = KpiMap::new();
    for (name, value) in [("Revenues", 89_498_000_000.0), ("NetIncomeLoss", 22_956_000_000.0)] {
        kpis.insert(
            name.to_string(),
            KpiRecord {
                name: name.to_string(),
                value,
                period: "2024-09-28".into(),
                filing_form: "10-Q".into(),
                filed_date: "2024-10-31".into(),
            },
        );
    }
    kpis
}

fn results() -> Vec<RetrievalResult> {
    vec![
        RetrievalResult {
            text: "Total net sales increased 6 percent.".into(),
            source_url: "https://www.sec.gov/Archives/edgar/data/320193/1/a.htm".into(),
            score: 0.8,
        },
        RetrievalResult {
            text: "Foreign exchange volatility remains a risk.".into(),
            source_url: "https://www.sec.gov/Archives/edgar/data/320193/2/b.htm".into(),
            score: 0.4,
        },
    ]
}

#[tokio::test]
async fn appends_exactly_one_sources_section() {
    let service = ScriptedService::ok(
        "Revenue grew to $89.5B [S1] while FX risk persists [S2].\n\nSources:\n- [S1] a.htm\n- [S2] b.htm",
    );
    let synthesizer = NarrativeSynthesizer::new(service.clone());

    let narrative = synthesizer.summarize(&kpis(), &results(), "How was the quarter?").await;

    assert_eq!(narrative.matches("Sources:").count(), 1);
    assert!(narrative.starts_with("Revenue grew to $89.5B [S1]"));
    assert!(narrative.ends_with(
        "**Sources:**\n- [S1]: https://www.sec.gov/Archives/edgar/data/320193/1/a.htm\n\
         - [S2]: https://www.sec.gov/Archives/edgar/data/320193/2/b.htm\n"
    ));

    let prompts = service.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[S2] Foreign exchange volatility remains a risk...."));
}

#[tokio::test]
async fn empty_retrieval_cites_fixed_sources() {
    let synthesizer = NarrativeSynthesizer::new(ScriptedService::ok("Steady quarter [S1]."));
    let narrative = synthesizer.summarize(&kpis(), &[], "latest quarterly performance").await;

    assert!(narrative.contains("- [S1]: https://www.sec.gov/edgar/sec-api-documentation"));
    assert!(narrative.contains("- [S2]: https://www.sec.gov/edgar\n"));
}

#[tokio::test]
async fn generation_failure_yields_fallback_text() {
    let synthesizer = NarrativeSynthesizer::new(ScriptedService::failing("quota exhausted"));
    let narrative = synthesizer.summarize(&kpis(), &results(), "Should I sell?").await;

    assert!(narrative.contains("Should I sell?"));
    assert!(narrative.contains("Based on 2 key metrics and 2 relevant documents."));
    assert!(narrative.contains("quota exhausted"));
    assert!(!narrative.contains("**Sources:**"));
}
