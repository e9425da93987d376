//! Deck scorer: pluggable backend that turns deck pages into a `RawAnalysis`.
//!
//! Default: `LlmDeckScorer`. The pipeline holds an `Arc<dyn DeckScorer>` so
//! tests run against an in-process scorer.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::analysis::prompts::{DECK_SCORING_PROMPT, DECK_SCORING_SYSTEM, RUBRIC_CATEGORIES};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::analysis::{AnalysisRequest, RawAnalysis};
use crate::pdf::PageData;

/// Upper bound on deck text sent to the model.
const MAX_DECK_CHARS: usize = 24_000;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed analysis from LLM: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait DeckScorer: Send + Sync {
    async fn score(
        &self,
        request: &AnalysisRequest,
        pages: &[PageData],
    ) -> Result<RawAnalysis, ScoreError>;
}

pub struct LlmDeckScorer(pub LlmClient);

#[async_trait]
impl DeckScorer for LlmDeckScorer {
    async fn score(
        &self,
        request: &AnalysisRequest,
        pages: &[PageData],
    ) -> Result<RawAnalysis, ScoreError> {
        let prompt = build_scoring_prompt(request, pages);
        let raw: RawAnalysis = self.0.call_json(&prompt, &scoring_system_prompt()).await?;
        raw.validate().map_err(ScoreError::Malformed)?;
        Ok(raw)
    }
}

pub fn scoring_system_prompt() -> String {
    format!("{DECK_SCORING_SYSTEM} {JSON_ONLY_SYSTEM}")
}

pub fn build_scoring_prompt(request: &AnalysisRequest, pages: &[PageData]) -> String {
    let rubric_schema = RUBRIC_CATEGORIES
        .iter()
        .map(|c| format!("\"{c}\": number"))
        .collect::<Vec<_>>()
        .join(", ");

    render_template(
        DECK_SCORING_PROMPT,
        &[
            ("audience_profile", request.audience_profile.clone()),
            ("sector", request.sector.clone()),
            ("region", request.region_label()),
            ("model_version", request.model_version.clone()),
            ("page_count", pages.len().to_string()),
            ("rubric_schema", rubric_schema),
            ("deck", render_deck(pages)),
        ],
    )
}

/// Fills `{name}` placeholders in one pass. Substituted values are never
/// rescanned, and unknown `{...}` tokens are left as written.
fn render_template(template: &str, values: &[(&str, String)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn render_deck(pages: &[PageData]) -> String {
    let mut deck = String::new();
    for page in pages {
        let mut section = format!(
            "--- Page {}: {} ---\n{}\n",
            page.index,
            page.title.as_deref().unwrap_or("(untitled)"),
            page.text
        );
        if !page.numbers.is_empty() {
            section.push_str(&format!("Figures: {}\n", page.numbers.join(", ")));
        }

        let remaining = MAX_DECK_CHARS.saturating_sub(deck.len());
        if section.len() > remaining {
            let cut = floor_char_boundary(&section, remaining);
            deck.push_str(&section[..cut]);
            deck.push_str("\n[deck truncated]\n");
            break;
        }
        deck.push_str(&section);
    }
    deck
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
