//! The cluster collaborator.
//!
//! A [`Transport`] carries one [`ClusterRequest`] to the cluster and hands
//! back the raw status and JSON body; it never interprets them. The
//! [`ClusterClient`] decides what counts as success for each operation.

pub mod client;
pub mod http;
pub mod memory;

pub use client::ClusterClient;
pub use self::http::HttpTransport;
pub use memory::MemoryCluster;

use crate::error::Result;
use async_trait::async_trait;
use ::http::StatusCode;
use serde_json::Value;

/// Every cluster operation the reconciler needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterRequest {
    Ping,
    IndexExists { index: String },
    CreateIndex { index: String, body: Value },
    DeleteIndex { index: String },
    CloseIndex { index: String },
    OpenIndex { index: String },
    GetMapping { index: String },
    GetSettings { index: String },
    /// Partial mapping update scoped to one type section.
    PutMapping {
        index: String,
        type_name: String,
        body: Value,
    },
    /// Partial settings update; analyzer changes need a closed index.
    PutSettings { index: String, body: Value },
    PutTemplate { name: String, body: Value },
    DeleteTemplate { name: String },
}

impl ClusterRequest {
    /// Stable operation name used in logs, errors and failure injection.
    pub fn operation(&self) -> &'static str {
        match self {
            ClusterRequest::Ping => "ping",
            ClusterRequest::IndexExists { .. } => "index_exists",
            ClusterRequest::CreateIndex { .. } => "create_index",
            ClusterRequest::DeleteIndex { .. } => "delete_index",
            ClusterRequest::CloseIndex { .. } => "close_index",
            ClusterRequest::OpenIndex { .. } => "open_index",
            ClusterRequest::GetMapping { .. } => "get_mapping",
            ClusterRequest::GetSettings { .. } => "get_settings",
            ClusterRequest::PutMapping { .. } => "put_mapping",
            ClusterRequest::PutSettings { .. } => "put_settings",
            ClusterRequest::PutTemplate { .. } => "put_template",
            ClusterRequest::DeleteTemplate { .. } => "delete_template",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            ClusterRequest::Ping
                | ClusterRequest::IndexExists { .. }
                | ClusterRequest::GetMapping { .. }
                | ClusterRequest::GetSettings { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResponse {
    pub status: StatusCode,
    /// Parsed JSON body; `Null` for empty bodies, a JSON string for
    /// bodies that are not JSON.
    pub body: Value,
}

impl ClusterResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Sends requests to a cluster. Failing to reach the cluster at all is an
/// `Err`; any answer, whatever its status, is an `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ClusterRequest) -> Result<ClusterResponse>;
}
