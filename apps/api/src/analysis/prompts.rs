// Deck scoring prompt templates.

/// Fixed rubric categories every analysis is scored on (1–10 each).
pub const RUBRIC_CATEGORIES: [&str; 9] = [
    "team",
    "problem",
    "solution",
    "market",
    "traction",
    "business_model",
    "competition",
    "financials",
    "ask",
];

/// Scoring persona. Sent together with `llm_client::prompts::JSON_ONLY_SYSTEM`.
pub const DECK_SCORING_SYSTEM: &str = "\
You are a senior venture analyst reviewing startup pitch decks. \
Score strictly and consistently; a 5 is an average fundable deck. \
Only use evidence present in the deck; never invent numbers.";

pub const DECK_SCORING_PROMPT: &str = r#"Score the following pitch deck.

CONTEXT:
- Audience profile: {audience_profile}
- Sector: {sector}
- Region: {region}
- Rubric version: {model_version}

DECK ({page_count} pages):
{deck}

OUTPUT SCHEMA (return exactly this structure):
{
  "scores": { {rubric_schema} },
  "red_flags": ["string"],
  "strengths": ["string"],
  "summary": "string",
  "comments": { "<category>": "one sentence justifying the score" }
}

RULES:
1. Every category in "scores" is a number from 1 to 10.
2. "red_flags" lists concrete concerns an investor would raise; empty if none.
3. Cite figures from the deck where they support a score.
4. Return ONLY the JSON object."#;
