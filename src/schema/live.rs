//! Extraction of the live schema from cluster responses.
//!
//! A response that lacks the expected container is malformed live state, a
//! precondition failure rather than drift: there is no baseline to compare.

use super::{Settings, TypeSection, DEFAULT_TYPE};
use crate::error::{IndexSyncError, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};

fn malformed(index: &str, message: &str) -> IndexSyncError {
    IndexSyncError::MalformedLiveState {
        index: index.to_string(),
        message: message.to_string(),
    }
}

/// Parameters that only appear at the root of a mapping, never as type names.
const ROOT_PARAMETERS: &[&str] = &[
    "properties",
    "dynamic_templates",
    "dynamic",
    "enabled",
    "date_detection",
    "numeric_detection",
    "dynamic_date_formats",
    "runtime",
    "subobjects",
    "_source",
    "_meta",
    "_routing",
    "_all",
    "_field_names",
    "_size",
];

/// A typeless mapping holds root parameters directly; a typed one holds
/// only objects keyed by type name.
fn is_typeless(mappings: &Map<String, Value>) -> bool {
    mappings
        .iter()
        .any(|(key, value)| ROOT_PARAMETERS.contains(&key.as_str()) || !value.is_object())
}

/// Live type sections from a get-mapping response
/// (`{"<index>": {"mappings": {...}}}`).
///
/// Typeless mappings are read as one section named `_doc`.
pub fn parse_live_mappings(index: &str, body: &Value) -> Result<IndexMap<String, TypeSection>> {
    let mappings = body
        .get(index)
        .and_then(|i| i.get("mappings"))
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(index, "response is missing the index or its mappings"))?;

    if is_typeless(mappings) {
        let section: TypeSection = serde_json::from_value(Value::Object(mappings.clone()))
            .map_err(|e| malformed(index, &format!("unreadable typeless mapping: {}", e)))?;
        let mut sections = IndexMap::new();
        sections.insert(DEFAULT_TYPE.to_string(), section);
        return Ok(sections);
    }

    let mut sections = IndexMap::with_capacity(mappings.len());
    for (type_name, raw) in mappings {
        let section: TypeSection = serde_json::from_value(raw.clone()).map_err(|e| {
            malformed(
                index,
                &format!("unreadable mapping for type {}: {}", type_name, e),
            )
        })?;
        sections.insert(type_name.clone(), section);
    }
    Ok(sections)
}

/// Live index settings from a get-settings response
/// (`{"<index>": {"settings": {"index": {...}}}}`).
///
/// An index without any analysis section yields empty analyzers.
pub fn parse_live_settings(index: &str, body: &Value) -> Result<Settings> {
    let settings = body
        .get(index)
        .and_then(|i| i.get("settings"))
        .and_then(|s| s.get("index"))
        .filter(|s| s.is_object())
        .ok_or_else(|| malformed(index, "response is missing the index or its settings"))?;

    serde_json::from_value(settings.clone())
        .map_err(|e| malformed(index, &format!("unreadable settings: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_mappings() {
        let body = json!({
            "products": {"mappings": {
                "doc": {"properties": {"title": {"type": "text"}}},
                "legacy": {"properties": {}}
            }}
        });
        let sections = parse_live_mappings("products", &body).unwrap();
        let names: Vec<&str> = sections.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["doc", "legacy"]);
    }

    #[test]
    fn test_typeless_mappings_become_default_section() {
        let body = json!({
            "products": {"mappings": {"properties": {"title": {"type": "text"}}}}
        });
        let sections = parse_live_mappings("products", &body).unwrap();
        assert_eq!(sections.len(), 1);
        assert!(sections[DEFAULT_TYPE].properties.contains_key("title"));
    }

    #[test]
    fn test_typeless_mapping_with_only_root_parameters() {
        // a strict index before its first field is mapped
        let body = json!({"products": {"mappings": {"dynamic": "strict"}}});
        let sections = parse_live_mappings("products", &body).unwrap();
        let names: Vec<&str> = sections.keys().map(String::as_str).collect();
        assert_eq!(names, vec![DEFAULT_TYPE]);
        assert!(sections[DEFAULT_TYPE].properties.is_empty());
        assert_eq!(sections[DEFAULT_TYPE].extra["dynamic"], json!("strict"));

        let body = json!({"products": {"mappings": {"_source": {"enabled": false}}}});
        let sections = parse_live_mappings("products", &body).unwrap();
        let names: Vec<&str> = sections.keys().map(String::as_str).collect();
        assert_eq!(names, vec![DEFAULT_TYPE]);
    }

    #[test]
    fn test_empty_mappings_have_no_sections() {
        let body = json!({"products": {"mappings": {}}});
        assert!(parse_live_mappings("products", &body).unwrap().is_empty());
    }

    #[test]
    fn test_missing_mappings_is_malformed() {
        let err = parse_live_mappings("products", &json!({"other": {}})).unwrap_err();
        assert!(matches!(err, IndexSyncError::MalformedLiveState { .. }));
    }

    #[test]
    fn test_settings_without_analysis() {
        let body = json!({
            "products": {"settings": {"index": {"number_of_shards": "2"}}}
        });
        let settings = parse_live_settings("products", &body).unwrap();
        assert!(settings.analyzers().is_empty());
    }

    #[test]
    fn test_settings_missing_index_container_is_malformed() {
        let body = json!({"products": {"settings": {}}});
        assert!(matches!(
            parse_live_settings("products", &body),
            Err(IndexSyncError::MalformedLiveState { .. })
        ));
    }
}
