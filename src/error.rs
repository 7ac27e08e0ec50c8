use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum IndexSyncError {
    #[error("Transport error during {operation}: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} failed with status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Malformed live state for index {index}: {message}")]
    MalformedLiveState { index: String, message: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Remediation task failed ({task}): {source}")]
    RemediationFailed {
        task: String,
        #[source]
        source: Box<IndexSyncError>,
    },

    #[error("Index {index} could not be reopened and may be left closed: {source}")]
    StuckClosed {
        index: String,
        #[source]
        source: Box<IndexSyncError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, IndexSyncError>;

impl From<std::io::Error> for IndexSyncError {
    fn from(e: std::io::Error) -> Self {
        IndexSyncError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for IndexSyncError {
    fn from(e: serde_json::Error) -> Self {
        IndexSyncError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for IndexSyncError {
    fn from(e: reqwest::Error) -> Self {
        IndexSyncError::transport("request", e)
    }
}

impl IndexSyncError {
    /// Wrap a reqwest failure with the name of the cluster operation it belongs to.
    pub fn transport(operation: &'static str, e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            format!("request timed out: {}", e)
        } else if e.is_connect() {
            format!("cluster unreachable: {}", e)
        } else {
            e.to_string()
        };
        IndexSyncError::Transport { operation, message }
    }

    /// Status code reported by the cluster, when the error came from a response.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            IndexSyncError::UnexpectedStatus { status, .. } => Some(*status),
            IndexSyncError::RemediationFailed { source, .. }
            | IndexSyncError::StuckClosed { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// True when the index may have been left closed by this failure.
    pub fn is_stuck_closed(&self) -> bool {
        matches!(self, IndexSyncError::StuckClosed { .. })
    }
}
