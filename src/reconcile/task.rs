use crate::error::{IndexSyncError, Result};
use crate::schema::{AnalyzerDescriptor, FieldDescriptor, NamedTemplate, TypeSection};
use crate::transport::ClusterClient;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt;

/// One additive change to a live index.
///
/// Each task carries the exact body it sends, so it can be listed in a dry
/// run and replayed safely: every task only adds structure the cluster does
/// not have yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemediationTask {
    AddTypeSection {
        type_name: String,
        body: Value,
    },
    /// The cluster replaces dynamic templates as a whole, so the body holds
    /// the complete declared list for the section.
    AddDynamicTemplate {
        type_name: String,
        template: String,
        body: Value,
    },
    AddField {
        type_name: String,
        field: String,
        body: Value,
    },
    AddAnalyzer {
        analyzer: String,
        body: Value,
    },
}

impl RemediationTask {
    pub fn add_type_section(type_name: &str, section: &TypeSection) -> Self {
        RemediationTask::AddTypeSection {
            type_name: type_name.to_string(),
            body: json!(section),
        }
    }

    pub fn add_dynamic_template(type_name: &str, template: &str, all: &[NamedTemplate]) -> Self {
        RemediationTask::AddDynamicTemplate {
            type_name: type_name.to_string(),
            template: template.to_string(),
            body: json!({ "dynamic_templates": all }),
        }
    }

    pub fn add_field(type_name: &str, field: &str, descriptor: &FieldDescriptor) -> Self {
        Self::add_nested_field(type_name, &[], field, descriptor)
    }

    /// A field below existing objects. `parents` is the object path from the
    /// section root; the body nests one `properties` level per parent.
    pub fn add_nested_field(
        type_name: &str,
        parents: &[&str],
        field: &str,
        descriptor: &FieldDescriptor,
    ) -> Self {
        let body = parents
            .iter()
            .rev()
            .fold(json!({ "properties": { field: descriptor } }), |body, parent| {
                json!({ "properties": { *parent: body } })
            });
        let mut path = parents.to_vec();
        path.push(field);
        RemediationTask::AddField {
            type_name: type_name.to_string(),
            field: path.join("."),
            body,
        }
    }

    pub fn add_analyzer(name: &str, analyzer: &AnalyzerDescriptor) -> Self {
        RemediationTask::AddAnalyzer {
            analyzer: name.to_string(),
            body: json!({ "analysis": { "analyzer": { name: analyzer } } }),
        }
    }

    /// Analyzer changes go through index settings and need a closed index.
    pub fn is_settings(&self) -> bool {
        matches!(self, RemediationTask::AddAnalyzer { .. })
    }

    pub fn body(&self) -> &Value {
        match self {
            RemediationTask::AddTypeSection { body, .. }
            | RemediationTask::AddDynamicTemplate { body, .. }
            | RemediationTask::AddField { body, .. }
            | RemediationTask::AddAnalyzer { body, .. } => body,
        }
    }

    pub async fn run(&self, client: &ClusterClient, index: &str) -> Result<()> {
        match self {
            RemediationTask::AddTypeSection { type_name, body }
            | RemediationTask::AddDynamicTemplate { type_name, body, .. }
            | RemediationTask::AddField { type_name, body, .. } => {
                client.put_mapping(index, type_name, body.clone()).await
            }
            RemediationTask::AddAnalyzer { body, .. } => client.put_settings(index, body.clone()).await,
        }
    }
}

impl fmt::Display for RemediationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationTask::AddTypeSection { type_name, .. } => {
                write!(f, "add type section `{}`", type_name)
            }
            RemediationTask::AddDynamicTemplate {
                type_name, template, ..
            } => write!(f, "add dynamic template `{}.{}`", type_name, template),
            RemediationTask::AddField {
                type_name, field, ..
            } => write!(f, "add field `{}.{}`", type_name, field),
            RemediationTask::AddAnalyzer { analyzer, .. } => {
                write!(f, "add analyzer `{}`", analyzer)
            }
        }
    }
}

/// Ordered remediation tasks, consumed strictly one at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQueue {
    tasks: VecDeque<RemediationTask>,
}

impl From<Vec<RemediationTask>> for TaskQueue {
    fn from(tasks: Vec<RemediationTask>) -> Self {
        Self {
            tasks: tasks.into(),
        }
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: RemediationTask) {
        self.tasks.push_back(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemediationTask> {
        self.tasks.iter()
    }

    /// Run the queued tasks in order and return how many were applied.
    ///
    /// The first failing task stops the queue; it and every task after it
    /// stay queued, and earlier tasks stay applied.
    pub async fn drain(&mut self, client: &ClusterClient, index: &str) -> Result<usize> {
        let mut applied = 0;
        while let Some(task) = self.tasks.front() {
            tracing::info!("[REMEDIATE {}] {}", index, task);
            if let Err(e) = task.run(client, index).await {
                tracing::error!("[REMEDIATE {}] {} failed: {}", index, task, e);
                return Err(IndexSyncError::RemediationFailed {
                    task: task.to_string(),
                    source: Box::new(e),
                });
            }
            self.tasks.pop_front();
            applied += 1;
        }
        Ok(applied)
    }
}
