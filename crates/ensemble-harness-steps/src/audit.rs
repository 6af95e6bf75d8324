// crates/ensemble-harness-steps/src/audit.rs
// ============================================================================
// Module: Step Audit Logging
// Description: Structured audit events for step execution.
// Purpose: Emit JSON-line step logs without hard dependencies.
// Dependencies: ensemble-harness-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Steps report what they did as [`StepAuditEvent`] records: start, success
//! and failure of each step, every status poll, and reuse of a shared
//! resource. Sinks route the records to stderr, an append-only file, memory,
//! or nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use ensemble_harness_config::ResourcesConfig;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// What a step audit event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step began.
    Started,
    /// The step completed.
    Succeeded,
    /// The step returned an error.
    Failed,
    /// A status read completed while polling.
    Polled,
    /// A shared resource was reused instead of created.
    Reused,
}

/// Step audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct StepAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Step name.
    pub step: &'static str,
    /// Event outcome.
    pub outcome: StepOutcome,
    /// Resource the event concerns, when known.
    pub resource: Option<String>,
    /// HTTP or resource status code, when relevant.
    pub status_code: Option<i64>,
    /// Free-form detail.
    pub message: Option<String>,
}

impl StepAuditEvent {
    /// Creates a new step audit event with a consistent timestamp.
    #[must_use]
    pub fn new(step: &'static str, outcome: StepOutcome) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "ensemble_step",
            timestamp_ms,
            step,
            outcome,
            resource: None,
            status_code: None,
            message: None,
        }
    }

    /// Attaches the resource the event concerns.
    #[must_use]
    pub fn with_resource(mut self, resource: impl ToString) -> Self {
        self.resource = Some(resource.to_string());
        self
    }

    /// Attaches a status code.
    #[must_use]
    pub const fn with_status_code(mut self, status_code: i64) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attaches a detail message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for step events.
pub trait StepAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &StepAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StepStderrAuditSink;

impl StepAuditSink for StepStderrAuditSink {
    fn record(&self, event: &StepAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct StepFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl StepFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl StepAuditSink for StepFileAuditSink {
    fn record(&self, event: &StepAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct StepMemoryAuditSink {
    /// Recorded events in order.
    events: Mutex<Vec<StepAuditEvent>>,
}

impl StepMemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<StepAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl StepAuditSink for StepMemoryAuditSink {
    fn record(&self, event: &StepAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op audit sink.
pub struct StepNoopAuditSink;

impl StepAuditSink for StepNoopAuditSink {
    fn record(&self, _event: &StepAuditEvent) {}
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the sink selected by resource settings.
///
/// A configured `audit_log` path selects the file sink; otherwise events go
/// to stderr.
///
/// # Errors
///
/// Returns an error if the audit log file cannot be opened.
pub fn sink_from_config(resources: &ResourcesConfig) -> io::Result<Arc<dyn StepAuditSink>> {
    match &resources.audit_log {
        Some(path) => Ok(Arc::new(StepFileAuditSink::new(path)?)),
        None => Ok(Arc::new(StepStderrAuditSink)),
    }
}
