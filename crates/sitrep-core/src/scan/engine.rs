//! The scan engine.
//!
//! Owns the recurring timer, the retry chain and the end-to-end attempt
//! orchestration. Runs as one cooperative task: the select loop below is
//! the only place state is touched, so attempts can never overlap. The
//! outermost recovery boundary for the whole cycle lives here; nothing
//! below it lets an error escape.
//!
//! ## State machine
//!
//! ```text
//! Idle -> Scanning -> Publishing -> Idle
//!               \-> Error -> (retry wait) -> Scanning   (up to 3 times)
//!               \-> Error -> Idle                       (chain exhausted)
//! ```

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::clock::ClockSource;
use crate::config::Config;
use crate::error::{ConfigError, EngineError};
use crate::events::{ReportSink, ScanPhase, StatusUpdate};
use crate::feed::{FeedFetcher, FeedSource, HttpFeedSource};
use crate::inference::{HttpInferenceClient, InferenceClient};
use crate::normalize::{normalize, NormalizedReport};
use crate::notify::{NotificationGate, NotificationPlanner, StaticGate};
use crate::publish::Publisher;
use crate::report::StoredReport;
use crate::scan::state::{RetryDecision, ScanState, MAX_RETRIES};
use crate::store::ReportStore;
use crate::synthesis::Synthesizer;
use crate::window::plan_window;

/// Control messages accepted while the engine runs.
enum Command {
    ForceScan,
    SetInterval(u32),
    Shutdown,
}

/// Cheap cloneable handle to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    /// Request an immediate manual scan. Resets the failure ledger;
    /// subject to the same mutual exclusion as any other entry. A retry
    /// timer already armed stays armed.
    pub fn force_scan(&self) {
        let _ = self.tx.send(Command::ForceScan);
    }

    /// Change the scan interval. Restarts the recurring timer without
    /// touching the scan counter or the last window time; never triggers
    /// an immediate scan (only the very first configure does that).
    pub fn set_interval(&self, minutes: u32) {
        let _ = self.tx.send(Command::SetInterval(minutes));
    }

    /// Stop the engine after the current attempt, if any, completes.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

/// Result of one successful scan attempt.
pub struct ScanOutcome {
    pub stored: StoredReport,
    pub has_updates: bool,
}

pub struct ScanEngine {
    interval_min: u32,
    clock: ClockSource,
    fetcher: FeedFetcher,
    synthesizer: Synthesizer,
    store: Arc<dyn ReportStore>,
    publisher: Publisher,
    sink: Arc<dyn ReportSink>,
    notifications: NotificationPlanner,
    state: ScanState,
    /// Key items of the most recently published report, fed back into
    /// synthesis to keep reports from repeating themselves.
    latest: Option<StoredReport>,
    /// Delay of a retry decided by the last attempt, armed by the run
    /// loop after the attempt returns.
    pending_retry: Option<Duration>,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl ScanEngine {
    pub fn new(
        interval_min: u32,
        inference: Arc<dyn InferenceClient>,
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn ReportStore>,
        sink: Arc<dyn ReportSink>,
        gate: Box<dyn NotificationGate>,
    ) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            interval_min,
            clock: ClockSource::new(inference.clone()),
            fetcher: FeedFetcher::new(feed),
            synthesizer: Synthesizer::new(inference),
            store: store.clone(),
            publisher: Publisher::new(store, sink.clone()),
            sink,
            notifications: NotificationPlanner::new(gate),
            state: ScanState::new(),
            latest: None,
            pending_retry: None,
            rx,
        };
        (engine, EngineHandle { tx })
    }

    /// Wire up an engine against the HTTP collaborators named in `config`.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn ReportStore>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<(Self, EngineHandle), ConfigError> {
        let feed_url = config
            .scan
            .feed_url
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "scan.feed_url".into(),
                message: format!("{e}"),
            })?;
        let endpoint = config
            .inference
            .endpoint
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "inference.endpoint".into(),
                message: format!("{e}"),
            })?;

        Ok(Self::new(
            config.scan.interval_min,
            Arc::new(HttpInferenceClient::new(endpoint)),
            Arc::new(HttpFeedSource::new(feed_url)),
            store,
            sink,
            Box::new(StaticGate {
                granted: config.notifications.enabled,
            }),
        ))
    }

    /// Seed the prior-report context, e.g. from reports loaded at startup.
    pub fn set_latest_report(&mut self, report: StoredReport) {
        self.latest = Some(report);
    }

    /// Run until [`EngineHandle::shutdown`] or until every handle is
    /// dropped. The first scan fires immediately; afterwards the
    /// recurring timer takes over, skipped while a retry chain is
    /// outstanding.
    pub async fn run(mut self) {
        let first_mount = self.state.mark_started();
        let mut ticker = Self::ticker(self.interval_min, first_mount);
        let mut retry_at: Option<Instant> = None;

        tracing::info!(interval_min = self.interval_min, "scan engine started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.state.tick_allowed() {
                        self.attempt(false).await;
                    } else {
                        tracing::debug!("tick skipped, retry chain outstanding");
                    }
                }
                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(far_future)),
                        if retry_at.is_some() => {
                    retry_at = None;
                    self.attempt(true).await;
                }
                cmd = self.rx.recv() => match cmd {
                    Some(Command::ForceScan) => {
                        if !self.state.is_scanning() {
                            tracing::info!("manual scan requested");
                            self.state.clear_retries();
                            self.attempt(false).await;
                        }
                    }
                    Some(Command::SetInterval(minutes)) => {
                        tracing::info!(interval_min = minutes, "scan interval changed");
                        self.interval_min = minutes;
                        ticker = Self::ticker(minutes, false);
                    }
                    Some(Command::Shutdown) | None => break,
                }
            }

            if let Some(delay) = self.pending_retry.take() {
                retry_at = Some(Instant::now() + delay);
            }
        }

        tracing::info!("scan engine stopped");
    }

    /// One manual attempt outside the run loop, without the retry chain.
    /// Used by one-shot callers; the run loop never calls this.
    pub async fn scan_once(&mut self) -> Result<ScanOutcome, EngineError> {
        self.state.mark_started();
        let entered = self.state.begin_attempt(false);
        debug_assert!(entered, "scan_once cannot overlap another attempt");
        let scan_no = self.state.scan_count();
        let result = self.run_scan(scan_no).await;
        self.state.finish_attempt();
        result
    }

    fn ticker(interval_min: u32, immediate: bool) -> tokio::time::Interval {
        let period = Duration::from_secs(u64::from(interval_min) * 60);
        let start = if immediate {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = tokio::time::interval_at(start, period);
        // A scan outlasting the period delays the next tick instead of
        // bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    async fn attempt(&mut self, is_retry: bool) {
        if !self.state.begin_attempt(is_retry) {
            return;
        }
        let scan_no = self.state.scan_count();
        tracing::info!(scan = scan_no, is_retry, "scan started");
        self.status(ScanPhase::Scanning, "scanning for the latest updates...");

        match self.run_scan(scan_no).await {
            Ok(outcome) => {
                let message = if outcome.has_updates {
                    format!("next update in {} minutes", self.interval_min)
                } else {
                    "no new developments".to_string()
                };
                tracing::info!(
                    scan = scan_no,
                    report = %outcome.stored.id,
                    has_updates = outcome.has_updates,
                    "scan published"
                );
                self.status(ScanPhase::Idle, message);
            }
            Err(error) => self.handle_failure(scan_no, &error),
        }

        self.state.finish_attempt();
    }

    async fn run_scan(&mut self, scan_no: u64) -> Result<ScanOutcome, EngineError> {
        let now = self.clock.authoritative_time().await;
        let window = plan_window(now, self.interval_min, self.state.last_scan_time());
        self.state.note_window_planned(now);
        tracing::info!(
            start = %window.start,
            end = %window.end,
            interval_min = window.interval_min,
            first_scan = window.is_first_scan,
            "analysis window planned"
        );

        self.status(ScanPhase::Scanning, "downloading fresh feed data...");
        let cache_buster = Utc::now().timestamp_millis().to_string();
        let (feed, catalog) = tokio::join!(
            self.fetcher.fetch(&cache_buster),
            self.store.list_weapons(),
        );
        let feed = feed?;
        let catalog = catalog.map_err(EngineError::CatalogLoad)?;
        tracing::debug!(feed_bytes = feed.len(), catalog_entries = catalog.len(), "scan inputs ready");

        self.status(ScanPhase::Scanning, "analyzing new events in the scan window...");
        let prior_key_items = self
            .latest
            .as_ref()
            .map(|r| r.report.key_items.clone())
            .unwrap_or_default();
        let raw = self
            .synthesizer
            .synthesize(&window, &feed, &prior_key_items, &catalog)
            .await?;

        // The race settled successfully: the failure ledger resets here,
        // before the shape check, so a malformed payload restarts the
        // chain at attempt 1.
        self.state.clear_retries();

        if !raw.is_object() {
            return Err(EngineError::MalformedSynthesis);
        }

        let NormalizedReport {
            report,
            has_updates,
        } = normalize(&raw, self.interval_min, scan_no);

        self.status(
            ScanPhase::Publishing,
            if has_updates {
                "publishing a new report..."
            } else {
                "confirming no changes..."
            },
        );

        let stored = self.publisher.publish(report).await?;
        if let Some(content) = self.notifications.plan(&stored) {
            self.sink.on_notification(&content);
        }
        self.latest = Some(stored.clone());

        Ok(ScanOutcome {
            stored,
            has_updates,
        })
    }

    fn handle_failure(&mut self, scan_no: u64, error: &EngineError) {
        tracing::warn!(scan = scan_no, %error, "scan failed");
        let network = error.is_network_class();

        match self.state.record_failure() {
            RetryDecision::Retry { attempt, delay } => {
                let message = if network {
                    format!("network problem, retrying (attempt {attempt}/{MAX_RETRIES})...")
                } else {
                    format!(
                        "temporary technical problem, retrying (attempt {attempt}/{MAX_RETRIES})..."
                    )
                };
                self.status(ScanPhase::Error, message);
                self.pending_retry = Some(delay);
            }
            RetryDecision::Defer => {
                let message = if network {
                    "persistent network problem, the engine will keep retrying automatically"
                        .to_string()
                } else {
                    format!(
                        "could not reach the data feed, next update in {} minutes",
                        self.interval_min
                    )
                };
                self.status(ScanPhase::Error, message);
            }
        }
    }

    fn status(&self, phase: ScanPhase, message: impl Into<String>) {
        self.sink.on_status(&StatusUpdate::now(phase, message));
    }
}

/// A deadline that never arrives, for the disarmed retry branch.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365)
}
