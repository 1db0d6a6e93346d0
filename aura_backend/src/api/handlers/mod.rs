pub mod alerts;
pub mod auth;
pub mod certifications;
pub mod farmers;
pub mod predictions;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use log::error;
use serde::Serialize;
use serde_json::Value;

use super::errors::{ApiError, ApiResult};

/// Unwrap a JSON body, turning extractor rejections into API errors.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(value) = payload?;
    Ok(value)
}

/// Names of the required fields that are absent.
pub(crate) fn missing<'a>(fields: &[(&'a str, bool)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect()
}

/// Present and non-blank
pub(crate) fn has_text(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}

/// Serialize a response document. Failing here is a server fault, never the
/// client's.
pub(crate) fn to_json<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        error!("Response serialization failed: {}", e);
        ApiError::internal_server_error("Server error")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_serialization_failure_is_server_error() {
        // Tuple keys cannot become JSON object keys
        let mut bad = BTreeMap::new();
        bad.insert((1u8, 2u8), "x");

        let err = to_json(&bad).unwrap_err();
        assert_eq!(err.code, 500);
        assert_eq!(err.message, "Server error");

        let ok = to_json(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(ok["a"], 1);
    }

    #[test]
    fn test_missing_lists_absent_fields() {
        let name = Some("Asha".to_string());
        let blank = Some("  ".to_string());
        let absent = missing(&[
            ("name", has_text(&name)),
            ("phone", has_text(&blank)),
            ("email", has_text(&None)),
        ]);
        assert_eq!(absent, vec!["phone", "email"]);
    }
}
