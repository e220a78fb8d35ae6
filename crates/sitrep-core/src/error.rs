//! Core error types for sitrep-core.
//!
//! Every failure mode of a scan attempt is a variant of [`EngineError`].
//! The scan controller is the outermost recovery boundary: none of these
//! errors propagate past it, they only drive the retry state machine and
//! the status channel.

use thiserror::Error;

use crate::inference::InferenceError;
use crate::store::StoreError;

/// Failures of a single scan attempt, caught at the controller boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The 90 second feed deadline won the race.
    #[error("timed out downloading the feed")]
    FetchTimeout,

    /// The feed body was not usable fresh data (shorter than the minimum).
    #[error("feed returned no usable fresh data")]
    InvalidFeed,

    /// Transport-level failure while fetching the feed.
    #[error("network error fetching the feed: {0}")]
    FeedRequest(#[from] reqwest::Error),

    /// The weapon catalog could not be loaded for this scan.
    #[error("failed to load the weapon catalog: {0}")]
    CatalogLoad(#[source] StoreError),

    /// The 60 second synthesis deadline won the race.
    #[error("timed out synthesizing the report")]
    SynthesisTimeout,

    /// The inference service rejected or failed the synthesis call.
    #[error("inference service error: {0}")]
    Synthesis(#[from] InferenceError),

    /// The synthesis result was not a JSON object.
    #[error("inference service returned a malformed result")]
    MalformedSynthesis,

    /// The report store rejected the publish.
    #[error("report store error: {0}")]
    Store(#[source] StoreError),
}

impl EngineError {
    /// Whether this failure is transport-level (a network-class error in
    /// the status messages) as opposed to a generic one. Timeouts are
    /// deliberately generic: a deadline firing says nothing about why the
    /// other side was slow.
    pub fn is_network_class(&self) -> bool {
        match self {
            EngineError::FeedRequest(_) => true,
            EngineError::Synthesis(e) => e.is_network(),
            EngineError::CatalogLoad(e) | EngineError::Store(e) => e.is_network(),
            _ => false,
        }
    }
}

/// Configuration load/save failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not resolve a config directory for this platform")]
    NoConfigDir,

    #[error("failed to read configuration from {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write configuration to {path}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for EngineError.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
