use crate::config::{ClusterConfig, IndexDefinition};
use crate::error::{IndexSyncError, Result};
use crate::reconcile::{self, Audit, Remediation, TaskQueue};
use crate::report::{ReportSink, TracingSink};
use crate::schema::live::{parse_live_mappings, parse_live_settings};
use crate::schema::IndexSchema;
use crate::transport::{ClusterClient, HttpTransport, Transport};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Result of [`IndexSync::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnsureOutcome {
    pub consistent: bool,
    /// The index did not exist and was created from the declared schema.
    pub created: bool,
    pub settings_consistent: bool,
    pub mappings_consistent: bool,
    pub settings_tasks: usize,
    pub mapping_tasks: usize,
}

impl EnsureOutcome {
    fn created() -> Self {
        EnsureOutcome {
            consistent: true,
            created: true,
            settings_consistent: true,
            mappings_consistent: true,
            settings_tasks: 0,
            mapping_tasks: 0,
        }
    }
}

/// Keeps one index in step with its declared schema.
///
/// Holds no cluster state between calls: every operation reads the live
/// schema afresh and compares it with the schema as it is at that moment,
/// so the owner may edit the schema through [`IndexSync::schema_mut`]
/// between calls.
pub struct IndexSync {
    client: ClusterClient,
    definition: IndexDefinition,
    sink: Arc<dyn ReportSink>,
    api_major: Option<u32>,
}

impl IndexSync {
    pub fn new(transport: Arc<dyn Transport>, definition: IndexDefinition) -> Self {
        Self {
            client: ClusterClient::new(transport),
            definition,
            sink: Arc::new(TracingSink),
            api_major: None,
        }
    }

    /// Talk to the cluster described by `config` over HTTP.
    pub fn connect(config: &ClusterConfig, definition: IndexDefinition) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        tracing::debug!("connecting to {} for index {}", transport.base_url(), definition.name);
        Ok(Self::new(Arc::new(transport), definition).with_api_major(config.api_major()))
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_api_major(mut self, api_major: Option<u32>) -> Self {
        self.api_major = api_major;
        self
    }

    pub fn index(&self) -> &str {
        &self.definition.name
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.definition.schema
    }

    pub fn schema_mut(&mut self) -> &mut IndexSchema {
        &mut self.definition.schema
    }

    pub fn client(&self) -> &ClusterClient {
        &self.client
    }

    pub async fn ping(&self) -> Result<bool> {
        self.client.ping().await
    }

    pub async fn exists(&self) -> Result<bool> {
        self.client.exists(self.index()).await
    }

    /// Create the index from the declared schema.
    pub async fn create(&self) -> Result<Value> {
        let body = self.schema().to_body()?;
        self.create_with(self.index(), body).await
    }

    pub async fn create_with(&self, index: &str, body: Value) -> Result<Value> {
        tracing::info!("creating index {}", index);
        self.client.create_index(index, body).await
    }

    /// Returns `false` when the index was already absent.
    pub async fn delete(&self) -> Result<bool> {
        let deleted = self.client.delete_index(self.index()).await?;
        if deleted {
            tracing::info!("deleted index {}", self.index());
        }
        Ok(deleted)
    }

    pub async fn get_mappings(&self) -> Result<Value> {
        self.client.get_mapping(self.index()).await
    }

    pub async fn get_settings(&self) -> Result<Value> {
        self.client.get_settings(self.index()).await
    }

    /// Install an index template applying `schema` to indices matching
    /// `patterns`.
    ///
    /// Clusters before 6.x take a single `template` pattern; asking them for
    /// more than one is a configuration error.
    pub async fn put_template(&self, name: &str, patterns: &[&str], schema: &IndexSchema) -> Result<Value> {
        let mut body = schema.to_body()?;
        match self.api_major {
            Some(major) if major < 6 => {
                if patterns.len() > 1 {
                    return Err(IndexSyncError::Config(format!(
                        "cluster API {} accepts a single template pattern, got {}",
                        major,
                        patterns.len()
                    )));
                }
                body["template"] = json!(patterns.concat());
            }
            _ => body["index_patterns"] = json!(patterns),
        }
        self.client.put_template(name, body).await
    }

    pub async fn delete_template(&self, name: &str) -> Result<Value> {
        self.client.delete_template(name).await
    }

    /// Dry run of the mapping audit.
    pub async fn audit_mappings(&self) -> Result<Audit> {
        let body = self.get_mappings().await?;
        let live = parse_live_mappings(self.index(), &body)?;
        Ok(reconcile::audit_mappings(self.index(), &self.schema().mappings, &live))
    }

    /// Dry run of the settings audit.
    pub async fn audit_settings(&self) -> Result<Audit> {
        let body = self.get_settings().await?;
        let live = parse_live_settings(self.index(), &body)?;
        Ok(reconcile::audit_settings(self.index(), &self.schema().settings, &live))
    }

    /// Audit the mappings, report drift and add whatever is missing.
    pub async fn remediate_mappings(&self) -> Result<Remediation> {
        let audit = self.audit_mappings().await?;
        self.report(&audit);
        let applied = reconcile::run_mapping_tasks(&self.client, self.index(), TaskQueue::from(audit.tasks)).await?;
        Ok(Remediation {
            consistent: audit.consistent,
            tasks_applied: applied,
        })
    }

    /// Audit the analyzers, report drift and add whatever is missing while
    /// the index is closed.
    pub async fn remediate_settings(&self) -> Result<Remediation> {
        let audit = self.audit_settings().await?;
        self.report(&audit);
        let applied = reconcile::run_settings_tasks(&self.client, self.index(), TaskQueue::from(audit.tasks)).await?;
        Ok(Remediation {
            consistent: audit.consistent,
            tasks_applied: applied,
        })
    }

    fn report(&self, audit: &Audit) {
        for finding in &audit.findings {
            self.sink.report(&finding.message, &finding.context);
        }
    }

    /// Create the index if it is missing, otherwise bring its settings and
    /// then its mappings up to date.
    pub async fn ensure(&self) -> Result<EnsureOutcome> {
        let index = self.index();
        if !self.exists().await? {
            tracing::info!("[ENSURE {}] index missing, creating from schema", index);
            self.create().await?;
            return Ok(EnsureOutcome::created());
        }

        let settings = self.remediate_settings().await?;
        tracing::debug!("[ENSURE {}] settings: {:?}", index, settings);
        let mappings = self.remediate_mappings().await?;
        tracing::debug!("[ENSURE {}] mappings: {:?}", index, mappings);

        let outcome = EnsureOutcome {
            consistent: settings.consistent && mappings.consistent,
            created: false,
            settings_consistent: settings.consistent,
            mappings_consistent: mappings.consistent,
            settings_tasks: settings.tasks_applied,
            mapping_tasks: mappings.tasks_applied,
        };
        if outcome.consistent {
            tracing::info!(
                "[ENSURE {}] consistent ({} settings tasks, {} mapping tasks)",
                index,
                outcome.settings_tasks,
                outcome.mapping_tasks
            );
        } else {
            tracing::warn!("[ENSURE {}] index has drifted from its schema", index);
        }
        Ok(outcome)
    }
}
