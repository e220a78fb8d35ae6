//! External append-only report store seam.
//!
//! The store is a collaborator, not part of this core: it assigns identity
//! and a creation timestamp on `create`, and serves the read-only weapon
//! catalog that synthesis cross-references. The catalog is re-fetched on
//! every scan; nothing here caches it.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

use crate::report::{CatalogEntry, Report, StoredReport};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("store rejected the request: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_network(&self) -> bool {
        matches!(self, StoreError::Network(_))
    }
}

/// Append-only persistence plus the catalog lookup.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a report, assigning identity and creation time.
    async fn create(&self, report: Report) -> Result<StoredReport, StoreError>;

    /// The reference weapon catalog, fetched fresh for each scan.
    async fn list_weapons(&self) -> Result<Vec<CatalogEntry>, StoreError>;
}

/// In-memory reference implementation. Backs the CLI demo and tests;
/// a deployment substitutes its own remote store behind the same trait.
#[derive(Default)]
pub struct MemoryStore {
    reports: Mutex<Vec<StoredReport>>,
    weapons: Mutex<Vec<CatalogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the weapon catalog served by `list_weapons`.
    pub fn with_weapons(weapons: Vec<CatalogEntry>) -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            weapons: Mutex::new(weapons),
        }
    }

    /// Snapshot of everything created so far, in insertion order.
    pub fn reports(&self) -> Vec<StoredReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn create(&self, report: Report) -> Result<StoredReport, StoreError> {
        let stored = StoredReport {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            report,
        };
        self.reports.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_weapons(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        Ok(self.weapons.lock().unwrap().clone())
    }
}
