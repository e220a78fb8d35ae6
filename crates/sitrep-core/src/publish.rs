//! Report publishing.
//!
//! Persist to the external append-only store, then forward the stored
//! report (now carrying server-assigned identity) to subscribers. No
//! dedup lives here: dedup is semantic, via `has_updates` and the prior
//! key items fed back into synthesis.

use std::sync::Arc;

use crate::error::EngineError;
use crate::events::ReportSink;
use crate::report::{Report, StoredReport};
use crate::store::ReportStore;

pub struct Publisher {
    store: Arc<dyn ReportStore>,
    sink: Arc<dyn ReportSink>,
}

impl Publisher {
    pub fn new(store: Arc<dyn ReportStore>, sink: Arc<dyn ReportSink>) -> Self {
        Self { store, sink }
    }

    /// Persist and announce one report.
    pub async fn publish(&self, report: Report) -> Result<StoredReport, EngineError> {
        let stored = self
            .store
            .create(report)
            .await
            .map_err(EngineError::Store)?;
        self.sink.on_report(&stored);
        Ok(stored)
    }
}
