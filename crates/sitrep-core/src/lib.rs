//! # Sitrep Core Library
//!
//! Core engine for Sitrep: a periodic report generator that fetches an
//! external data feed, summarizes it through a natural-language inference
//! call, and publishes deduplicated, structured situation reports to
//! subscribers. The engine tolerates network flakiness and inference
//! latency through hard deadlines and a bounded linear retry chain.
//!
//! ## Architecture
//!
//! - **Scan engine**: a single-task `select!` loop owning the recurring
//!   timer, the retry chain, and all scan state
//! - **Collaborator seams**: the inference service, the feed transport
//!   and the report store are traits; deployments plug in their own
//! - **Normalizer**: a total function repairing whatever the inference
//!   service returns into a complete [`Report`]
//! - **Subscribers**: passive [`ReportSink`] implementations receiving
//!   status transitions, stored reports and prepared notifications
//!
//! ## Key Components
//!
//! - [`ScanEngine`] / [`EngineHandle`]: the controller and its remote
//! - [`Synthesizer`]: prompt construction and the structured-output call
//! - [`normalize`]: result repair and the "anything new" verdict
//! - [`Config`]: TOML configuration management

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod inference;
pub mod normalize;
pub mod notify;
pub mod publish;
pub mod report;
pub mod scan;
pub mod store;
pub mod synthesis;
pub mod window;

pub use clock::ClockSource;
pub use config::Config;
pub use error::{ConfigError, EngineError};
pub use events::{NullSink, ReportSink, ScanPhase, StatusUpdate};
pub use feed::{FeedFetcher, FeedSource, HttpFeedSource};
pub use inference::{
    HttpInferenceClient, InferenceClient, InferenceError, InferenceRequest, InferenceResponse,
};
pub use normalize::{normalize, NormalizedReport};
pub use notify::{NotificationContent, NotificationGate, NotificationPlanner, StaticGate};
pub use publish::Publisher;
pub use report::{
    AlertStatus, CatalogEntry, MentionCategory, MentionedLocation, MentionedWeapon, Report,
    StoredReport, NO_UPDATES_SENTINEL,
};
pub use scan::{EngineHandle, ScanEngine, ScanOutcome};
pub use store::{MemoryStore, ReportStore, StoreError};
pub use synthesis::Synthesizer;
pub use window::{plan_window, TimeWindow, FIRST_SCAN_INTERVAL_MIN};
