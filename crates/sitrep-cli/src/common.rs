//! Shared pieces for the CLI commands.

use sitrep_core::{NotificationContent, ReportSink, StatusUpdate, StoredReport};

/// Prints every engine event as one JSON line on stdout.
pub struct JsonLineSink;

impl ReportSink for JsonLineSink {
    fn on_status(&self, status: &StatusUpdate) {
        if let Ok(line) = serde_json::to_string(status) {
            println!("{line}");
        }
    }

    fn on_report(&self, report: &StoredReport) {
        if let Ok(line) = serde_json::to_string(report) {
            println!("{line}");
        }
    }

    fn on_notification(&self, content: &NotificationContent) {
        if let Ok(line) = serde_json::to_string(content) {
            println!("{line}");
        }
    }
}

/// Single-threaded runtime: the engine is one cooperative task.
pub fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
