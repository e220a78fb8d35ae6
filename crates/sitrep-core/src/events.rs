//! Status channel and subscriber seam.
//!
//! The engine reports every state transition through [`ReportSink`].
//! Subscribers are passive: they receive borrowed payloads and must not
//! block, since the engine runs on a single cooperative task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::NotificationContent;
use crate::report::StoredReport;

/// Externally visible phase of the scan controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    Scanning,
    Publishing,
    Idle,
    Error,
}

/// One status transition, emitted at every state change of the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub phase: ScanPhase,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn now(phase: ScanPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Subscriber seam. All methods default to no-ops so a sink implements
/// only the channels it cares about.
pub trait ReportSink: Send + Sync {
    /// Invoked at each controller state transition.
    fn on_status(&self, _status: &StatusUpdate) {}

    /// Invoked once per successful scan with the stored report.
    fn on_report(&self, _report: &StoredReport) {}

    /// Invoked when a published report warrants a user-facing
    /// notification. Delivery mechanics belong to the host.
    fn on_notification(&self, _content: &NotificationContent) {}
}

/// Sink that drops everything. Useful for tests and one-shot scans.
pub struct NullSink;

impl ReportSink for NullSink {}
