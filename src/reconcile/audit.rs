//! Whole-schema comparison.
//!
//! An audit walks the declared schema against the live one and sorts every
//! difference into one of three buckets: additive (a remediation task),
//! changed (a finding that needs a reindex) or orphaned (a finding for live
//! structure the schema no longer declares). Audits never touch the cluster.

use super::diff::{analyzer_differences, diff_dynamic_template, diff_field};
use super::matcher::is_dynamically_explained;
use super::task::RemediationTask;
use crate::schema::{FieldDescriptor, Settings, TypeSection};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Declared and live definitions disagree; only a reindex can fix it.
    Changed,
    /// Present live but no longer declared.
    Orphaned,
}

/// A difference that cannot be remediated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    /// Dotted location, e.g. `products.doc.title`.
    pub subject: String,
    pub message: String,
    pub context: Value,
}

impl Finding {
    fn changed(subject: String, message: String, context: Value) -> Self {
        Finding {
            kind: FindingKind::Changed,
            subject,
            message,
            context,
        }
    }

    fn orphaned(subject: String, what: &str, names: &[&str]) -> Self {
        Finding {
            kind: FindingKind::Orphaned,
            message: format!(
                "{} were removed from schema but still exist in index: {} -> {}",
                what,
                subject,
                names.join(", ")
            ),
            context: json!({ "names": names }),
            subject,
        }
    }
}

/// Result of one audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Audit {
    /// False once any finding was recorded. Pending tasks do not make an
    /// audit inconsistent: they are the additive fix.
    pub consistent: bool,
    pub tasks: Vec<RemediationTask>,
    pub findings: Vec<Finding>,
}

impl Audit {
    fn new(tasks: Vec<RemediationTask>, findings: Vec<Finding>) -> Self {
        Audit {
            consistent: findings.is_empty(),
            tasks,
            findings,
        }
    }

    /// Consistent with nothing left to add.
    pub fn is_in_sync(&self) -> bool {
        self.consistent && self.tasks.is_empty()
    }
}

/// Audit every declared type section against the live mappings.
pub fn audit_mappings(
    index: &str,
    declared: &IndexMap<String, TypeSection>,
    live: &IndexMap<String, TypeSection>,
) -> Audit {
    let mut tasks = Vec::new();
    let mut findings = Vec::new();

    for (type_name, section) in declared {
        match live.get(type_name) {
            // the whole section goes in one request; nothing below it to compare
            None => tasks.push(RemediationTask::add_type_section(type_name, section)),
            Some(live_section) => audit_section(
                index,
                type_name,
                section,
                live_section,
                &mut tasks,
                &mut findings,
            ),
        }
    }

    let dead_sections: Vec<&str> = live
        .keys()
        .filter(|name| !declared.contains_key(*name))
        .map(String::as_str)
        .collect();
    if !dead_sections.is_empty() {
        findings.push(Finding::orphaned(index.to_string(), "Type sections", &dead_sections));
    }

    tracing::debug!(
        "mapping audit of {}: {} tasks, {} findings",
        index,
        tasks.len(),
        findings.len()
    );
    Audit::new(tasks, findings)
}

fn audit_section(
    index: &str,
    type_name: &str,
    declared: &TypeSection,
    live: &TypeSection,
    tasks: &mut Vec<RemediationTask>,
    findings: &mut Vec<Finding>,
) {
    let section_path = format!("{}.{}", index, type_name);

    // Dynamic templates
    let mut checked_templates: HashSet<&str> = HashSet::new();
    for named in &declared.dynamic_templates {
        checked_templates.insert(&named.name);
        let live_template = match live.template(&named.name) {
            Some(t) => t,
            None => {
                tasks.push(RemediationTask::add_dynamic_template(
                    type_name,
                    &named.name,
                    &declared.dynamic_templates,
                ));
                continue;
            }
        };

        let verdict = diff_dynamic_template(&named.template, &live_template.template, &named.name);
        if !verdict.consistent {
            let subject = format!("{}.{}", section_path, named.name);
            findings.push(Finding::changed(
                subject.clone(),
                format!(
                    "Dynamic mapping definition changed, a complete reindex is the only way to update it: {}",
                    subject
                ),
                json!({
                    "expected": named.template,
                    "actual": live_template.template,
                    "reason": verdict.reason,
                }),
            ));
        }
    }

    let dead_templates: Vec<&str> = live
        .dynamic_templates
        .iter()
        .map(|t| t.name.as_str())
        .filter(|name| !checked_templates.contains(name))
        .collect();
    if !dead_templates.is_empty() {
        findings.push(Finding::orphaned(
            section_path.clone(),
            "Dynamic templates",
            &dead_templates,
        ));
    }

    // Fields
    let fields = FieldWalk {
        type_name,
        section: declared,
        section_path: &section_path,
    };
    fields.audit(&[], &declared.properties, &live.properties, tasks, findings);
}

/// Field audit of one type section, descending into objects.
struct FieldWalk<'a> {
    type_name: &'a str,
    /// Declared section, for its dynamic templates.
    section: &'a TypeSection,
    section_path: &'a str,
}

impl FieldWalk<'_> {
    fn audit(
        &self,
        parents: &[&str],
        declared: &IndexMap<String, FieldDescriptor>,
        live: &IndexMap<String, FieldDescriptor>,
        tasks: &mut Vec<RemediationTask>,
        findings: &mut Vec<Finding>,
    ) {
        let prefix: String = parents.iter().map(|p| format!("{}.", p)).collect();

        for (name, field) in declared {
            let live_field = match live.get(name) {
                Some(f) => f,
                None => {
                    tasks.push(RemediationTask::add_nested_field(self.type_name, parents, name, field));
                    continue;
                }
            };

            let path = format!("{}{}", prefix, name);
            let verdict = diff_field(field, live_field, &path);
            if !verdict.consistent {
                let subject = format!("{}.{}", self.section_path, path);
                findings.push(Finding::changed(
                    subject.clone(),
                    format!(
                        "Mapping definition changed, a complete reindex is the only way to update it: {}",
                        subject
                    ),
                    json!({
                        "expected": field,
                        "actual": live_field,
                        "reason": verdict.reason,
                    }),
                ));
                continue;
            }

            // an object the cluster has no children for yet is still an object
            if let Some(children) = field.properties() {
                if field.is_enabled() && live_field.multi_fields().is_none() {
                    let empty = IndexMap::new();
                    let live_children = live_field.properties().unwrap_or(&empty);
                    let mut nested = parents.to_vec();
                    nested.push(name.as_str());
                    self.audit(&nested, children, live_children, tasks, findings);
                }
            }
        }

        let dead_fields: Vec<&str> = live
            .iter()
            .filter(|(name, live_field)| {
                !declared.contains_key(*name)
                    && !is_dynamically_explained(
                        self.section,
                        &format!("{}{}", prefix, name),
                        live_field,
                    )
            })
            .map(|(name, _)| name.as_str())
            .collect();
        if !dead_fields.is_empty() {
            let subject = match parents {
                [] => self.section_path.to_string(),
                _ => format!("{}.{}", self.section_path, parents.join(".")),
            };
            findings.push(Finding::orphaned(subject, "Properties", &dead_fields));
        }
    }
}

/// Audit the declared analyzers against the live index settings.
pub fn audit_settings(index: &str, declared: &Settings, live: &Settings) -> Audit {
    let mut tasks = Vec::new();
    let mut findings = Vec::new();

    for (name, analyzer) in declared.analyzers() {
        match live.analyzers().get(name) {
            None => tasks.push(RemediationTask::add_analyzer(name, analyzer)),
            Some(live_analyzer) => {
                let differing = analyzer_differences(analyzer, live_analyzer);
                if !differing.is_empty() {
                    let subject = format!("{}.settings.analysis.analyzer.{}", index, name);
                    findings.push(Finding::changed(
                        subject.clone(),
                        format!(
                            "Analyzer definition changed, a complete reindex is the only way to update it: {}",
                            subject
                        ),
                        json!({
                            "expected": analyzer,
                            "actual": live_analyzer,
                            "differences": differing,
                        }),
                    ));
                }
            }
        }
    }

    let dead_analyzers: Vec<&str> = live
        .analyzers()
        .keys()
        .filter(|name| !declared.analyzers().contains_key(*name))
        .map(String::as_str)
        .collect();
    if !dead_analyzers.is_empty() {
        findings.push(Finding::orphaned(index.to_string(), "Analyzers", &dead_analyzers));
    }

    tracing::debug!(
        "settings audit of {}: {} tasks, {} findings",
        index,
        tasks.len(),
        findings.len()
    );
    Audit::new(tasks, findings)
}
