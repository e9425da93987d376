//! One-shot outbound notification of a completed analysis.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::models::analysis::AdjustedAnalysis;

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("callback endpoint returned HTTP {0}")]
    Status(u16),

    #[error("could not encode callback body: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct CallbackNotifier {
    client: Client,
}

impl CallbackNotifier {
    pub fn new(timeout_secs: u64) -> Result<Self, CallbackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// POSTs `{analysis_id, ...result, secret}` once. No retry.
    pub async fn notify(
        &self,
        url: &str,
        analysis_id: &str,
        result: &AdjustedAnalysis,
        secret: &str,
    ) -> Result<(), CallbackError> {
        let body = callback_body(analysis_id, result, secret)?;
        let response = self.client.post(url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallbackError::Status(status.as_u16()));
        }
        info!("Callback delivered for analysis {analysis_id} (HTTP {status})");
        Ok(())
    }
}

pub fn callback_body(
    analysis_id: &str,
    result: &AdjustedAnalysis,
    secret: &str,
) -> Result<Value, CallbackError> {
    let mut body = Map::new();
    body.insert("analysis_id".into(), Value::String(analysis_id.to_string()));
    if let Value::Object(fields) = serde_json::to_value(result)? {
        body.extend(fields);
    }
    body.insert("secret".into(), Value::String(secret.to_string()));
    Ok(Value::Object(body))
}
