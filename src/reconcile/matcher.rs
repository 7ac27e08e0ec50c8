//! Decides whether an undeclared live field was produced by one of the
//! declared dynamic templates rather than left behind by a removed field.

use super::pattern::{glob_matches, regex_matches};
use crate::schema::{flatten, DynamicTemplate, FieldDescriptor, TypeSection};

/// One predicate of a template rule. Predicates run in order and the first
/// failure rejects the template.
type Predicate = fn(&DynamicTemplate, &str, &FieldDescriptor) -> bool;

const PREDICATES: [(&str, Predicate); 4] = [
    ("match", check_match),
    ("unmatch", check_unmatch),
    ("path_match", check_paths),
    ("match_mapping_type", check_mapping_type),
];

/// True if any dynamic template declared in `section` explains `live`,
/// the live descriptor at `field_path`.
///
/// `field_path` is dotted from the section root. `match` and `unmatch` see
/// its last segment, `path_match` and `path_unmatch` the whole path.
pub fn is_dynamically_explained(section: &TypeSection, field_path: &str, live: &FieldDescriptor) -> bool {
    section.dynamic_templates.iter().any(|named| {
        let explained = template_explains(&named.template, field_path, live);
        if explained {
            tracing::debug!(
                "field {} is explained by dynamic template {}",
                field_path,
                named.name
            );
        }
        explained
    })
}

/// Evaluate a single template against a live field.
pub fn template_explains(template: &DynamicTemplate, field_name: &str, live: &FieldDescriptor) -> bool {
    for (name, predicate) in PREDICATES {
        if !predicate(template, field_name, live) {
            tracing::trace!("field {} rejected by {} predicate", field_name, name);
            return false;
        }
    }
    true
}

fn leaf_name(field_path: &str) -> &str {
    field_path.rsplit('.').next().unwrap_or(field_path)
}

fn check_match(template: &DynamicTemplate, field_path: &str, _live: &FieldDescriptor) -> bool {
    let name = leaf_name(field_path);
    match &template.match_name {
        None => true,
        Some(pattern) if template.match_is_regex() => regex_matches(pattern, name),
        Some(pattern) => glob_matches(pattern, name),
    }
}

fn check_unmatch(template: &DynamicTemplate, field_path: &str, _live: &FieldDescriptor) -> bool {
    match &template.unmatch {
        None => true,
        Some(pattern) => !glob_matches(pattern, leaf_name(field_path)),
    }
}

/// `path_match` and `path_unmatch` narrow the dotted leaves under the field;
/// the predicate fails once no leaf is left.
fn check_paths(template: &DynamicTemplate, field_name: &str, live: &FieldDescriptor) -> bool {
    if template.path_match.is_none() && template.path_unmatch.is_none() {
        return true;
    }

    let mut paths: Vec<String> = flatten(field_name, live).into_keys().collect();

    if let Some(pattern) = &template.path_match {
        paths.retain(|p| glob_matches(pattern, p));
        if paths.is_empty() {
            return false;
        }
    }

    if let Some(pattern) = &template.path_unmatch {
        paths.retain(|p| !glob_matches(pattern, p));
        if paths.is_empty() {
            return false;
        }
    }

    true
}

/// A live field without a type is a pure container and cannot contradict
/// a type rule.
fn check_mapping_type(template: &DynamicTemplate, _field_name: &str, live: &FieldDescriptor) -> bool {
    match (&template.match_mapping_type, live.field_type()) {
        (Some(rule), Some(live_type)) => rule.accepts(live_type),
        _ => true,
    }
}
