//! HTTP request surface.
//!
//! Every JSON answer carries `"success"`; failures are rendered by
//! `ServiceError` as `{"success": false, "error": "..."}`.

pub mod carousel;
pub mod health;
pub mod output;
pub mod templates;

use crate::error::{ServiceError, ServiceResult};
use actix_web::web::JsonConfig;

/// JSON extractor settings: body limit and the error envelope for bodies
/// that do not parse.
pub fn json_config(limit: usize) -> JsonConfig {
    JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| ServiceError::Validation(format!("Invalid JSON body: {}", err)).into())
}

/// Unwraps a required request field, rejecting missing and blank values.
pub(crate) fn required(value: Option<String>, field: &str) -> ServiceResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ServiceError::Validation(format!(
            "Missing required field: {}",
            field
        ))),
    }
}
