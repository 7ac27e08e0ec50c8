//! Structural comparison of one declared unit against its live counterpart.
//!
//! Every mismatch of a unit is collected before a verdict is returned, so a
//! report shows the full extent of the drift at once.

use crate::schema::{AnalyzerDescriptor, DynamicTemplate, FieldDescriptor};
use serde::Serialize;

/// Outcome of comparing one field, template or analyzer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub consistent: bool,
    /// Empty when consistent, otherwise every mismatch joined by `"; "`.
    pub reason: String,
}

impl Verdict {
    fn from_mismatches(mismatches: Vec<String>) -> Self {
        Verdict {
            consistent: mismatches.is_empty(),
            reason: mismatches.join("; "),
        }
    }
}

/// Compare a declared field against the live one. `label` names the field
/// in the reasons.
pub fn diff_field(declared: &FieldDescriptor, live: &FieldDescriptor, label: &str) -> Verdict {
    let mut mismatches = Vec::new();
    compare_field(declared, live, label, &mut mismatches);
    Verdict::from_mismatches(mismatches)
}

fn compare_field(declared: &FieldDescriptor, live: &FieldDescriptor, label: &str, out: &mut Vec<String>) {
    match declared.multi_fields() {
        None => compare_simple(declared, live, label, out),
        Some(declared_fields) => {
            let differing = differing_attrs(declared, live);
            if !differing.is_empty() {
                out.push(format!(
                    "multi-field parent mismatch: `{}` ({})",
                    label,
                    differing.join(", ")
                ));
            }
            if declared.attrs().includes_in_all() != live.attrs().includes_in_all() {
                out.push(format!("include_in_all mismatch: `{}`", label));
            }

            let live_fields = live.multi_fields();
            for (name, declared_sub) in declared_fields {
                match live_fields.and_then(|f| f.get(name)) {
                    None => out.push(format!("multi-field missing: `{}`", name)),
                    Some(live_sub) => {
                        let differing = differing_attrs(declared_sub, live_sub);
                        if !differing.is_empty() {
                            out.push(format!(
                                "multi-field mismatch: `{}.{}` ({})",
                                label,
                                name,
                                differing.join(", ")
                            ));
                        }
                    }
                }
            }

            if let Some(live_fields) = live_fields {
                let leftover: Vec<&str> = live_fields
                    .keys()
                    .filter(|name| !declared_fields.contains_key(*name))
                    .map(String::as_str)
                    .collect();
                report_leftover_multi_fields(&leftover, out);
            }
        }
    }
}

/// Leaf and object fields. Object children are left to the auditor, which
/// walks them as fields of their own.
fn compare_simple(declared: &FieldDescriptor, live: &FieldDescriptor, label: &str, out: &mut Vec<String>) {
    match (declared.is_enabled(), live.is_enabled()) {
        // nothing to see inside a disabled field
        (false, false) => return,
        (true, true) => {}
        (declared_enabled, live_enabled) => {
            out.push(format!(
                "enabled mismatch: `{}` (declared {}, live {})",
                label, declared_enabled, live_enabled
            ));
            return;
        }
    }

    let mut differing = differing_attrs(declared, live);
    if declared.attrs().includes_in_all() != live.attrs().includes_in_all() {
        differing.push("include_in_all");
    }
    if !differing.is_empty() {
        out.push(format!(
            "field mismatch: `{}` ({})",
            label,
            differing.join(", ")
        ));
    }

    // a live multi-field under a plain declared field was dropped from the schema
    if let Some(live_fields) = live.multi_fields() {
        let leftover: Vec<&str> = live_fields.keys().map(String::as_str).collect();
        report_leftover_multi_fields(&leftover, out);
    }
}

fn report_leftover_multi_fields(leftover: &[&str], out: &mut Vec<String>) {
    if !leftover.is_empty() {
        out.push(format!(
            "multi-field removed from schema but still present in index: {}",
            leftover.join(", ")
        ));
    }
}

/// Names of the type / index / analyzer attributes that differ.
fn differing_attrs(declared: &FieldDescriptor, live: &FieldDescriptor) -> Vec<&'static str> {
    let mut differing = Vec::new();
    if declared.effective_type() != live.effective_type() {
        differing.push("type");
    }
    if declared.attrs().is_indexed() != live.attrs().is_indexed() {
        differing.push("index");
    }
    if declared.attrs().analyzer != live.attrs().analyzer {
        differing.push("analyzer");
    }
    differing
}

/// Compare a declared dynamic template against the live template of the
/// same name: the matching rules must be identical and the mappings must
/// agree as fields do.
pub fn diff_dynamic_template(declared: &DynamicTemplate, live: &DynamicTemplate, label: &str) -> Verdict {
    let mut mismatches = Vec::new();

    let mut rules = Vec::new();
    if declared.match_name != live.match_name {
        rules.push("match");
    }
    if declared.match_is_regex() != live.match_is_regex() {
        rules.push("match_pattern");
    }
    if declared.unmatch != live.unmatch {
        rules.push("unmatch");
    }
    if declared.path_match != live.path_match {
        rules.push("path_match");
    }
    if declared.path_unmatch != live.path_unmatch {
        rules.push("path_unmatch");
    }
    if declared.match_mapping_type != live.match_mapping_type {
        rules.push("match_mapping_type");
    }
    if !rules.is_empty() {
        mismatches.push(format!(
            "dynamic template rule mismatch: `{}` ({})",
            label,
            rules.join(", ")
        ));
    }

    compare_field(&declared.mapping, &live.mapping, label, &mut mismatches);
    Verdict::from_mismatches(mismatches)
}

/// Names of the analyzer parts that differ. Filter order matters.
pub fn analyzer_differences(declared: &AnalyzerDescriptor, live: &AnalyzerDescriptor) -> Vec<&'static str> {
    let mut differing = Vec::new();
    if declared.analyzer_type != live.analyzer_type {
        differing.push("type");
    }
    if declared.char_filter != live.char_filter {
        differing.push("char_filter");
    }
    if declared.tokenizer != live.tokenizer {
        differing.push("tokenizer");
    }
    if declared.filter != live.filter {
        differing.push("filter");
    }
    differing
}

pub fn diff_analyzer(declared: &AnalyzerDescriptor, live: &AnalyzerDescriptor) -> bool {
    analyzer_differences(declared, live).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(value: serde_json::Value) -> FieldDescriptor {
        serde_json::from_value(value).unwrap()
    }

    fn category() -> serde_json::Value {
        json!({
            "type": "text",
            "analyzer": "snowball",
            "fields": {
                "raw": {"type": "keyword"},
                "lowered": {"type": "text", "analyzer": "lowercase_only"}
            }
        })
    }

    #[test]
    fn test_identical_fields_are_consistent() {
        for value in [
            json!({"type": "long"}),
            json!({"type": "date", "format": "dateOptionalTime"}),
            json!({"enabled": false}),
            category(),
        ] {
            let verdict = diff_field(&field(value.clone()), &field(value), "f");
            assert!(verdict.consistent);
            assert!(verdict.reason.is_empty());
        }
    }

    #[test]
    fn test_type_change_simple() {
        let verdict = diff_field(
            &field(json!({"type": "keyword"})),
            &field(json!({"type": "text"})),
            "color",
        );
        assert!(!verdict.consistent);
        assert!(verdict.reason.contains("`color`"));
        assert!(verdict.reason.contains("type"));
    }

    #[test]
    fn test_type_change_multi_field() {
        let mut declared = category();
        declared["fields"]["raw"]["type"] = json!("text");
        let verdict = diff_field(&field(declared), &field(category()), "category");
        assert!(!verdict.consistent);
        assert!(verdict.reason.contains("multi-field mismatch: `category.raw`"));

        let mut declared = category();
        declared["type"] = json!("keyword");
        let verdict = diff_field(&field(declared), &field(category()), "category");
        assert!(!verdict.consistent);
        assert!(verdict.reason.contains("parent mismatch"));
    }

    #[test]
    fn test_object_type_matches_untyped_object() {
        // children added by documents come back without the explicit type
        let verdict = diff_field(
            &field(json!({"type": "object"})),
            &field(json!({"properties": {"x": {"type": "keyword"}}})),
            "meta",
        );
        assert!(verdict.consistent, "{}", verdict.reason);

        let verdict = diff_field(
            &field(json!({"type": "object"})),
            &field(json!({"type": "nested", "properties": {}})),
            "meta",
        );
        assert!(!verdict.consistent);
    }

    #[test]
    fn test_disabled_fields() {
        // both opaque: nothing else is compared
        let verdict = diff_field(
            &field(json!({"enabled": false})),
            &field(json!({"enabled": false, "type": "object"})),
            "raw_thing",
        );
        assert!(verdict.consistent);

        let verdict = diff_field(
            &field(json!({"enabled": false})),
            &field(json!({"type": "object", "properties": {}})),
            "raw_thing",
        );
        assert!(!verdict.consistent);
        assert!(verdict.reason.contains("enabled mismatch"));
    }

    #[test]
    fn test_index_flag_shapes_compare_equal() {
        let verdict = diff_field(
            &field(json!({"type": "long", "index": "not_analyzed"})),
            &field(json!({"type": "long", "index": true})),
            "atom",
        );
        assert!(verdict.consistent);

        let verdict = diff_field(
            &field(json!({"type": "keyword", "index": false})),
            &field(json!({"type": "keyword"})),
            "some_url",
        );
        assert!(!verdict.consistent);
        assert!(verdict.reason.contains("index"));
    }

    #[test]
    fn test_include_in_all_is_strict_either_way() {
        let on = field(json!({"type": "text", "include_in_all": true}));
        let off = field(json!({"type": "text"}));
        assert!(!diff_field(&on, &off, "name").consistent);
        assert!(!diff_field(&off, &on, "name").consistent);
        let explicit_off = field(json!({"type": "text", "include_in_all": false}));
        assert!(diff_field(&explicit_off, &off, "name").consistent);
    }

    #[test]
    fn test_all_multi_field_mismatches_accumulate() {
        let declared = field(json!({
            "type": "text",
            "fields": {
                "raw": {"type": "keyword"},
                "lowered": {"type": "text", "analyzer": "lowercase_only"},
                "english": {"type": "text", "analyzer": "english"}
            }
        }));
        let live = field(json!({
            "type": "text",
            "fields": {
                "raw": {"type": "keyword"},
                "lowered": {"type": "text", "analyzer": "standard"},
                "legacy": {"type": "keyword"}
            }
        }));

        let verdict = diff_field(&declared, &live, "name");
        assert!(!verdict.consistent);
        assert!(verdict.reason.contains("multi-field mismatch: `name.lowered` (analyzer)"));
        assert!(verdict.reason.contains("multi-field missing: `english`"));
        assert!(verdict
            .reason
            .contains("multi-field removed from schema but still present in index: legacy"));
    }

    #[test]
    fn test_live_multi_field_under_simple_declaration() {
        let verdict = diff_field(
            &field(json!({"type": "text"})),
            &field(json!({"type": "text", "fields": {"raw": {"type": "keyword"}}})),
            "title",
        );
        assert!(!verdict.consistent);
        assert!(verdict.reason.contains("still present in index: raw"));
    }

    #[test]
    fn test_dynamic_template_diff() {
        let declared: DynamicTemplate = serde_json::from_value(json!({
            "match": "category_name_*",
            "match_mapping_type": "string",
            "mapping": {"type": "keyword"}
        }))
        .unwrap();
        assert!(diff_dynamic_template(&declared, &declared.clone(), "cats").consistent);

        let mut changed_rule = declared.clone();
        changed_rule.match_name = Some("cat_*".into());
        let verdict = diff_dynamic_template(&declared, &changed_rule, "cats");
        assert!(!verdict.consistent);
        assert!(verdict.reason.contains("(match)"));

        let mut changed_mapping = declared.clone();
        changed_mapping.mapping = FieldDescriptor::typed("text");
        let verdict = diff_dynamic_template(&declared, &changed_mapping, "cats");
        assert!(!verdict.consistent);
        assert!(verdict.reason.contains("field mismatch: `cats`"));
    }

    #[test]
    fn test_analyzer_filter_order_matters() {
        let declared = AnalyzerDescriptor::custom(&["html_strip"], "standard", &["lowercase", "stop", "snowball"]);
        assert!(diff_analyzer(&declared, &declared.clone()));

        let reordered = AnalyzerDescriptor::custom(&["html_strip"], "standard", &["stop", "lowercase", "snowball"]);
        assert!(!diff_analyzer(&declared, &reordered));
        assert_eq!(analyzer_differences(&declared, &reordered), vec!["filter"]);

        let other_tokenizer = AnalyzerDescriptor::custom(&["html_strip"], "whitespace", &["lowercase", "stop", "snowball"]);
        assert_eq!(analyzer_differences(&declared, &other_tokenizer), vec!["tokenizer"]);
    }

    #[test]
    fn test_analyzer_empty_char_filter_equals_absent() {
        let declared: AnalyzerDescriptor = serde_json::from_value(json!({
            "type": "custom", "char_filter": [], "tokenizer": "keyword", "filter": ["lowercase"]
        }))
        .unwrap();
        let live: AnalyzerDescriptor = serde_json::from_value(json!({
            "type": "custom", "tokenizer": "keyword", "filter": "lowercase"
        }))
        .unwrap();
        assert!(diff_analyzer(&declared, &live));
    }

    #[test]
    fn test_analyzer_parameters_outside_the_chain_are_not_compared() {
        let declared: AnalyzerDescriptor =
            serde_json::from_value(json!({"type": "standard", "stopwords": "_english_"})).unwrap();
        let live: AnalyzerDescriptor = serde_json::from_value(json!({"type": "standard"})).unwrap();
        assert!(diff_analyzer(&declared, &live));
    }
}
