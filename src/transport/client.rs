use super::{ClusterRequest, ClusterResponse, Transport};
use crate::error::{IndexSyncError, Result};
use http::StatusCode;
use serde_json::Value;
use std::sync::Arc;

/// Typed cluster operations on top of a [`Transport`].
///
/// Any 2xx answer is success. The exceptions are existence checks
/// (404 means absent) and deletes (404 means already gone).
#[derive(Clone)]
pub struct ClusterClient {
    transport: Arc<dyn Transport>,
}

impl ClusterClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn send(&self, request: ClusterRequest) -> Result<ClusterResponse> {
        let operation = request.operation();
        let response = self.transport.send(request).await?;
        tracing::trace!("{} -> {}", operation, response.status);
        Ok(response)
    }

    async fn expect_success(&self, request: ClusterRequest) -> Result<Value> {
        let operation = request.operation();
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(unexpected(operation, response))
        }
    }

    /// Whether the cluster answers at all. Unreachable is an error; a
    /// non-2xx answer is `false`.
    pub async fn ping(&self) -> Result<bool> {
        let response = self.send(ClusterRequest::Ping).await?;
        Ok(response.is_success())
    }

    pub async fn exists(&self, index: &str) -> Result<bool> {
        let request = ClusterRequest::IndexExists {
            index: index.to_string(),
        };
        let operation = request.operation();
        let response = self.send(request).await?;
        match response.status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(unexpected(operation, response)),
        }
    }

    pub async fn create_index(&self, index: &str, body: Value) -> Result<Value> {
        self.expect_success(ClusterRequest::CreateIndex {
            index: index.to_string(),
            body,
        })
        .await
    }

    /// Returns `true` if the index was deleted by this call, `false` if it
    /// was already absent.
    pub async fn delete_index(&self, index: &str) -> Result<bool> {
        let request = ClusterRequest::DeleteIndex {
            index: index.to_string(),
        };
        let operation = request.operation();
        let response = self.send(request).await?;
        match response.status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(unexpected(operation, response)),
        }
    }

    pub async fn close_index(&self, index: &str) -> Result<()> {
        self.expect_success(ClusterRequest::CloseIndex {
            index: index.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub async fn open_index(&self, index: &str) -> Result<()> {
        self.expect_success(ClusterRequest::OpenIndex {
            index: index.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub async fn get_mapping(&self, index: &str) -> Result<Value> {
        self.expect_success(ClusterRequest::GetMapping {
            index: index.to_string(),
        })
        .await
    }

    pub async fn get_settings(&self, index: &str) -> Result<Value> {
        self.expect_success(ClusterRequest::GetSettings {
            index: index.to_string(),
        })
        .await
    }

    pub async fn put_mapping(&self, index: &str, type_name: &str, body: Value) -> Result<()> {
        self.expect_success(ClusterRequest::PutMapping {
            index: index.to_string(),
            type_name: type_name.to_string(),
            body,
        })
        .await
        .map(|_| ())
    }

    pub async fn put_settings(&self, index: &str, body: Value) -> Result<()> {
        self.expect_success(ClusterRequest::PutSettings {
            index: index.to_string(),
            body,
        })
        .await
        .map(|_| ())
    }

    pub async fn put_template(&self, name: &str, body: Value) -> Result<Value> {
        self.expect_success(ClusterRequest::PutTemplate {
            name: name.to_string(),
            body,
        })
        .await
    }

    pub async fn delete_template(&self, name: &str) -> Result<Value> {
        self.expect_success(ClusterRequest::DeleteTemplate {
            name: name.to_string(),
        })
        .await
    }
}

fn unexpected(operation: &'static str, response: ClusterResponse) -> IndexSyncError {
    let body = match response.body {
        Value::String(s) => s,
        other => other.to_string(),
    };
    IndexSyncError::UnexpectedStatus {
        operation,
        status: response.status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryCluster;
    use serde_json::json;

    #[tokio::test]
    async fn test_exists_and_delete_treat_404_as_absent() {
        let cluster = Arc::new(MemoryCluster::new());
        let client = ClusterClient::new(cluster.clone());

        assert!(!client.exists("products").await.unwrap());
        assert!(!client.delete_index("products").await.unwrap());

        client.create_index("products", json!({})).await.unwrap();
        assert!(client.exists("products").await.unwrap());
        assert!(client.delete_index("products").await.unwrap());
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let cluster = Arc::new(MemoryCluster::new());
        let client = ClusterClient::new(cluster.clone());

        let err = client.get_mapping("missing").await.unwrap_err();
        assert_eq!(err.status_code(), Some(StatusCode::NOT_FOUND));
        assert!(err.to_string().contains("get_mapping"));
    }

    #[tokio::test]
    async fn test_ping_reports_unreachable_as_error() {
        let cluster = Arc::new(MemoryCluster::new());
        let client = ClusterClient::new(cluster.clone());
        assert!(client.ping().await.unwrap());

        cluster.set_reachable(false);
        assert!(matches!(
            client.ping().await,
            Err(IndexSyncError::Transport { .. })
        ));
    }
}
