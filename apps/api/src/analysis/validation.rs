use reqwest::Url;
use serde_json::{Map, Value};

use crate::errors::FieldError;
use crate::models::analysis::AnalysisRequest;

/// Checks a submission body field by field, collecting every problem, and
/// builds the typed request when the body is clean.
pub fn validate_submission(body: &Value) -> Result<AnalysisRequest, Vec<FieldError>> {
    let Some(obj) = body.as_object() else {
        return Err(vec![FieldError::new("body", "must be a JSON object")]);
    };

    let mut errors = Vec::new();

    let analysis_id = required_string(obj, "analysis_id", &mut errors);
    let file_url = required_string(obj, "file_url", &mut errors);
    if let Some(url) = &file_url {
        if let Err(msg) = check_http_url(url) {
            errors.push(FieldError::new("file_url", msg));
        }
    }
    let audience_profile = required_string(obj, "audience_profile", &mut errors);
    let sector = required_string(obj, "sector", &mut errors);
    let model_version = required_string(obj, "model_version", &mut errors);

    let region = match obj.get("region") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("region", "is required"));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.push(FieldError::new("region", "must not be empty"));
            None
        }
        Some(v) => Some(v.clone()),
    };

    let callback_url = optional_string(obj, "callback_url", &mut errors);
    if let Some(url) = &callback_url {
        if let Err(msg) = check_http_url(url) {
            errors.push(FieldError::new("callback_url", msg));
        }
    }
    let callback_secret = optional_string(obj, "callback_secret", &mut errors);

    match (analysis_id, file_url, audience_profile, sector, region, model_version) {
        (
            Some(analysis_id),
            Some(file_url),
            Some(audience_profile),
            Some(sector),
            Some(region),
            Some(model_version),
        ) if errors.is_empty() => Ok(AnalysisRequest {
            analysis_id,
            file_url,
            audience_profile,
            sector,
            region,
            model_version,
            callback_url,
            callback_secret,
        }),
        _ => Err(errors),
    }
}

fn required_string(
    obj: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.push(FieldError::new(field, "must not be empty"));
            None
        }
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            None
        }
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            None
        }
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("must be a valid URL ({e})"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("must use http or https".to_string());
    }
    if url.host_str().is_none() {
        return Err("must include a host".to_string());
    }
    Ok(())
}
