use crate::error::{IndexSyncError, Result};
use crate::schema::IndexSchema;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const DEFAULT_URL: &str = "http://127.0.0.1:9200";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Connection settings for the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Cluster API version such as `"6.8"`; unknown means current.
    #[serde(default)]
    pub api_version: Option<String>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            api_version: None,
        }
    }
}

impl ClusterConfig {
    /// Load cluster configuration from environment variables.
    ///
    /// Optional: INDEXSYNC_URL (defaults to http://127.0.0.1:9200)
    /// Optional: INDEXSYNC_TIMEOUT_MS (defaults to 30000)
    /// Optional: INDEXSYNC_API_VERSION
    pub fn from_env() -> Result<Self> {
        let url = env::var("INDEXSYNC_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());

        let request_timeout_ms = match env::var("INDEXSYNC_TIMEOUT_MS") {
            Ok(raw) => raw.parse().map_err(|_| {
                IndexSyncError::Config(format!("Invalid INDEXSYNC_TIMEOUT_MS: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_MS,
        };

        let api_version = env::var("INDEXSYNC_API_VERSION")
            .ok()
            .filter(|v| !v.is_empty());

        let config = Self {
            url,
            request_timeout_ms,
            api_version,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(IndexSyncError::Config(format!(
                "Cluster URL must use http:// or https://, got: {}",
                self.url
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(IndexSyncError::Config(
                "Request timeout must be greater than zero".into(),
            ));
        }
        if let Some(version) = &self.api_version {
            if parse_major(version).is_none() {
                return Err(IndexSyncError::Config(format!(
                    "Invalid cluster API version: {}",
                    version
                )));
            }
        }
        Ok(())
    }

    /// Major version of the cluster API, if configured.
    pub fn api_major(&self) -> Option<u32> {
        self.api_version.as_deref().and_then(parse_major)
    }

    /// Clusters from 7.x on have no mapping types.
    pub fn is_typeless(&self) -> bool {
        self.api_major().map_or(false, |major| major >= 7)
    }
}

fn parse_major(version: &str) -> Option<u32> {
    version.split('.').next()?.trim().parse().ok()
}

/// An index name together with its declared schema, as stored on disk:
/// `{"name": "...", "schema": {"settings": {...}, "mappings": {...}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub schema: IndexSchema,
}

impl IndexDefinition {
    pub fn new(name: &str, schema: IndexSchema) -> Self {
        Self {
            name: name.to_string(),
            schema,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let definition: IndexDefinition = serde_json::from_str(&content)
            .map_err(|e| IndexSyncError::InvalidSchema(e.to_string()))?;
        if definition.name.is_empty() {
            return Err(IndexSyncError::InvalidSchema(
                "index name must not be empty".into(),
            ));
        }
        Ok(definition)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
