use super::{ClusterRequest, ClusterResponse, Transport};
use crate::config::ClusterConfig;
use crate::error::{IndexSyncError, Result};
use crate::schema::DEFAULT_TYPE;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// REST transport speaking the cluster's native HTTP API.
pub struct HttpTransport {
    base_url: String,
    http_client: reqwest::Client,
    /// Cluster without mapping types (7.x and later).
    typeless: bool,
}

impl HttpTransport {
    pub fn new(config: &ClusterConfig) -> Result<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| IndexSyncError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            http_client,
            typeless: config.is_typeless(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn route(&self, request: &ClusterRequest) -> (Method, String, Option<Value>) {
        let base = &self.base_url;
        match request {
            ClusterRequest::Ping => (Method::HEAD, format!("{}/", base), None),
            ClusterRequest::IndexExists { index } => (Method::HEAD, format!("{}/{}", base, index), None),
            ClusterRequest::CreateIndex { index, body } => {
                let body = if self.typeless {
                    strip_default_type(body)
                } else {
                    body.clone()
                };
                (Method::PUT, format!("{}/{}", base, index), Some(body))
            }
            ClusterRequest::DeleteIndex { index } => (Method::DELETE, format!("{}/{}", base, index), None),
            ClusterRequest::CloseIndex { index } => (Method::POST, format!("{}/{}/_close", base, index), None),
            ClusterRequest::OpenIndex { index } => (Method::POST, format!("{}/{}/_open", base, index), None),
            ClusterRequest::GetMapping { index } => (Method::GET, format!("{}/{}/_mapping", base, index), None),
            ClusterRequest::GetSettings { index } => (Method::GET, format!("{}/{}/_settings", base, index), None),
            ClusterRequest::PutMapping {
                index,
                type_name,
                body,
            } => {
                let url = if self.typeless && type_name == DEFAULT_TYPE {
                    format!("{}/{}/_mapping", base, index)
                } else {
                    format!("{}/{}/_mapping/{}", base, index, type_name)
                };
                (Method::PUT, url, Some(body.clone()))
            }
            ClusterRequest::PutSettings { index, body } => {
                (Method::PUT, format!("{}/{}/_settings", base, index), Some(body.clone()))
            }
            ClusterRequest::PutTemplate { name, body } => {
                (Method::PUT, format!("{}/_template/{}", base, name), Some(body.clone()))
            }
            ClusterRequest::DeleteTemplate { name } => {
                (Method::DELETE, format!("{}/_template/{}", base, name), None)
            }
        }
    }
}

/// Typeless clusters take `mappings` without the `_doc` wrapper.
fn strip_default_type(body: &Value) -> Value {
    let mut body = body.clone();
    if let Some(mappings) = body.get_mut("mappings").and_then(Value::as_object_mut) {
        if mappings.len() == 1 {
            if let Some(section) = mappings.remove(DEFAULT_TYPE) {
                body["mappings"] = section;
            }
        }
    }
    body
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ClusterRequest) -> Result<ClusterResponse> {
        let operation = request.operation();
        let (method, url, body) = self.route(&request);
        tracing::debug!("{} {} ({})", method, url, operation);

        let mut builder = self.http_client.request(method, &url);
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| IndexSyncError::transport(operation, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IndexSyncError::transport(operation, e))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ClusterResponse { status, body })
    }
}
