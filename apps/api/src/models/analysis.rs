use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The submitted payload for one pitch-deck analysis, as stored on the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub analysis_id: String,
    pub file_url: String,
    pub audience_profile: String,
    pub sector: String,
    /// Usually an object such as `{"macro": "EU", "country": "FR"}`, but any
    /// non-null JSON value is accepted.
    pub region: Value,
    pub model_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_secret: Option<String>,
}

impl AnalysisRequest {
    /// Callback target, only when both the URL and the shared secret were supplied.
    pub fn callback(&self) -> Option<(&str, &str)> {
        match (self.callback_url.as_deref(), self.callback_secret.as_deref()) {
            (Some(url), Some(secret)) => Some((url, secret)),
            _ => None,
        }
    }

    /// Human-readable region for prompts: `"EU / FR"` for objects, the raw
    /// string for strings, compact JSON otherwise.
    pub fn region_label(&self) -> String {
        match &self.region {
            Value::String(s) => s.clone(),
            Value::Object(map) => {
                let parts: Vec<String> = ["macro", "country", "city"]
                    .iter()
                    .filter_map(|k| map.get(*k).and_then(|v| v.as_str()))
                    .map(String::from)
                    .collect();
                if parts.is_empty() {
                    self.region.to_string()
                } else {
                    parts.join(" / ")
                }
            }
            other => other.to_string(),
        }
    }
}

/// Scoring output of the language model, validated at the point it is parsed.
///
/// `scores` and `red_flags` are the only fields the adjuster touches; every
/// other key (summary, strengths, per-rubric comments...) rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnalysis {
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawAnalysis {
    /// Rejects scores the adjuster cannot reason about.
    pub fn validate(&self) -> Result<(), String> {
        if self.scores.is_empty() {
            return Err("analysis contains no scores".to_string());
        }
        for (category, value) in &self.scores {
            if !value.is_finite() || *value < 0.0 {
                return Err(format!("score for '{category}' is not a valid number: {value}"));
            }
        }
        Ok(())
    }
}

/// A raw analysis after an investor profile has been applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedAnalysis {
    #[serde(flatten)]
    pub analysis: RawAnalysis,
    pub profile_applied: String,
}
