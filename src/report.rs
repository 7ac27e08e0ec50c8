use serde_json::Value;
use std::sync::Mutex;

/// Receives operator-facing drift warnings.
pub trait ReportSink: Send + Sync {
    fn report(&self, message: &str, context: &Value);
}

/// Emits every report as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&self, message: &str, context: &Value) {
        tracing::warn!(context = %context, "{}", message);
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<(String, Value)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, Value)> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.reports().into_iter().map(|(message, _)| message).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

impl ReportSink for MemorySink {
    fn report(&self, message: &str, context: &Value) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((message.to_string(), context.clone()));
    }
}
