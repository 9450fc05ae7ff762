//! Diagnostic captures on failure events.
//!
//! The engine only names the event (`hotels_load_error`,
//! `star_filter_3_error`, ...); where and how the capture is persisted is up
//! to the sink. Captures are fire-and-forget: a sink never fails the run.

use async_trait::async_trait;
use std::sync::Mutex;

/// Receiver of labeled diagnostic captures
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    /// Capture the current page under `label`
    async fn capture(&self, label: &str);
}

/// Sink that drops every capture
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

#[async_trait]
impl DiagnosticsSink for NullDiagnostics {
    async fn capture(&self, label: &str) {
        tracing::debug!(label, "diagnostic capture skipped");
    }
}

/// Sink that remembers labels in order, for tests and summaries
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    labels: Mutex<Vec<String>>,
}

impl RecordingDiagnostics {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels captured so far
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.labels
            .lock()
            .map(|labels| labels.clone())
            .unwrap_or_default()
    }

    /// Whether a label was captured
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.labels().iter().any(|l| l == label)
    }
}

#[async_trait]
impl DiagnosticsSink for RecordingDiagnostics {
    async fn capture(&self, label: &str) {
        if let Ok(mut labels) = self.labels.lock() {
            labels.push(label.to_string());
        }
    }
}
