// Pitch-deck analysis: submission, queueing, scoring, profile adjustment, callback.
// All LLM calls go through llm_client; all PDF access goes through pdf.

pub mod callback;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod scorer;
pub mod validation;
