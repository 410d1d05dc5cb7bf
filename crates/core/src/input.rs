//! JSON document loading with field-path error reporting.

use crate::error::{AnalyticsError, AnalyticsResult};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse a JSON document, reporting the path of the first offending field
/// (e.g. `journeys[2].revenue`) when it does not match `T`.
pub fn parse_document<T: DeserializeOwned>(text: &str) -> AnalyticsResult<T> {
    let mut de = serde_json::Deserializer::from_str(text);
    let value = serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let field = match err.path().to_string() {
            path if path == "." => "<document>".to_string(),
            path => path,
        };
        AnalyticsError::invalid_input(field, err.inner().to_string())
    })?;
    de.end()
        .map_err(|err| AnalyticsError::invalid_input("<document>", err.to_string()))?;
    Ok(value)
}

/// Read and parse a JSON document from disk.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> AnalyticsResult<T> {
    let text = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "Read input document");
    parse_document(&text)
}

/// Reject negative or non-finite amounts, naming the field.
pub fn ensure_non_negative(field: impl FnOnce() -> String, value: f64) -> AnalyticsResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AnalyticsError::invalid_input(
            field(),
            format!("expected a non-negative number, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Doc {
        items: Vec<Item>,
    }

    #[derive(Debug, Deserialize)]
    struct Item {
        #[allow(dead_code)]
        name: String,
        amount: f64,
    }

    fn field_of(err: AnalyticsError) -> String {
        match err {
            AnalyticsError::InvalidInput { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_valid_document() {
        let doc: Doc = parse_document(r#"{"items": [{"name": "a", "amount": 1.5}]}"#).unwrap();
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].amount, 1.5);
    }

    #[test]
    fn test_type_error_reports_field_path() {
        let err = parse_document::<Doc>(
            r#"{"items": [{"name": "a", "amount": 1}, {"name": "b", "amount": "lots"}]}"#,
        )
        .unwrap_err();
        assert_eq!(field_of(err), "items[1].amount");
    }

    #[test]
    fn test_missing_top_level_key() {
        let err = parse_document::<Doc>(r#"{"campaigns": []}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("items"), "{message}");
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(parse_document::<Doc>(r#"{"items": []} extra"#).is_err());
    }

    #[test]
    fn test_ensure_non_negative() {
        assert!(ensure_non_negative(|| "spend".into(), 0.0).is_ok());
        let err = ensure_non_negative(|| "campaigns[0].spend".into(), -5.0).unwrap_err();
        assert_eq!(field_of(err), "campaigns[0].spend");
        assert!(ensure_non_negative(|| "x".into(), f64::NAN).is_err());
    }
}
