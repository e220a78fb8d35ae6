//! Scan controller state.
//!
//! A single owned value, mutated only through the methods below. The run
//! loop is one cooperative task, so no lock is needed; the methods exist
//! to keep every transition in one place and testable.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Consecutive failures tolerated before the cycle gives up and waits for
/// the next scheduled tick.
pub const MAX_RETRIES: u32 = 3;

/// Base unit of the linear retry backoff. Delays are exactly
/// `attempt * RETRY_STEP`: 15 s, 30 s, 45 s. Preserved exactly; no jitter,
/// no exponential escalation.
pub const RETRY_STEP: Duration = Duration::from_secs(15);

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule one retry after `delay`; this will be attempt `attempt`
    /// of [`MAX_RETRIES`].
    Retry { attempt: u32, delay: Duration },
    /// The chain is exhausted for this cycle; wait for the regular tick.
    Defer,
}

#[derive(Debug, Default)]
pub struct ScanState {
    is_scanning: bool,
    retry_count: u32,
    scan_count: u64,
    last_scan_time: Option<DateTime<Utc>>,
    /// One-time latch: set when the controller is first configured, so
    /// interval changes later never trigger an immediate scan.
    started: bool,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_scanning(&self) -> bool {
        self.is_scanning
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn scan_count(&self) -> u64 {
        self.scan_count
    }

    pub fn last_scan_time(&self) -> Option<DateTime<Utc>> {
        self.last_scan_time
    }

    /// Whether the regular tick may start an attempt right now. A pending
    /// retry chain takes priority; the tick is skipped, not queued.
    pub fn tick_allowed(&self) -> bool {
        self.retry_count == 0
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Consume the first-configure latch. True exactly once.
    pub fn mark_started(&mut self) -> bool {
        let first = !self.started;
        self.started = true;
        first
    }

    /// Try to enter `Scanning`. Rejected while a scan is in flight unless
    /// the entry is an internally-scheduled retry. On acceptance the
    /// attempt is counted and the mutual-exclusion flag raised.
    pub fn begin_attempt(&mut self, is_retry: bool) -> bool {
        if self.is_scanning && !is_retry {
            return false;
        }
        self.scan_count += 1;
        self.is_scanning = true;
        true
    }

    /// The attempt ended, success or not. Lowers the mutual-exclusion
    /// flag; retry bookkeeping is separate.
    pub fn finish_attempt(&mut self) {
        self.is_scanning = false;
    }

    /// Record the authoritative time the window was planned at. Happens
    /// before the fetch, so even a failed first attempt flips first-scan
    /// detection off for the retry.
    pub fn note_window_planned(&mut self, at: DateTime<Utc>) {
        self.last_scan_time = Some(at);
    }

    /// Clear the failure ledger. Called when the synthesis race settles
    /// successfully, and by a manual force-scan.
    pub fn clear_retries(&mut self) {
        self.retry_count = 0;
    }

    /// Count a failure and decide what happens next.
    pub fn record_failure(&mut self) -> RetryDecision {
        self.retry_count += 1;
        if self.retry_count <= MAX_RETRIES {
            RetryDecision::Retry {
                attempt: self.retry_count,
                delay: RETRY_STEP * self.retry_count,
            }
        } else {
            self.retry_count = 0;
            RetryDecision::Defer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_are_mutually_exclusive() {
        let mut state = ScanState::new();
        assert!(state.begin_attempt(false));
        assert_eq!(state.scan_count(), 1);

        // A second regular entry is a no-op with no state change.
        assert!(!state.begin_attempt(false));
        assert_eq!(state.scan_count(), 1);
        assert!(state.is_scanning());

        // A retry entry bypasses the flag.
        assert!(state.begin_attempt(true));
        assert_eq!(state.scan_count(), 2);

        state.finish_attempt();
        assert!(!state.is_scanning());
    }

    #[test]
    fn retry_delays_are_linear_then_defer() {
        let mut state = ScanState::new();

        assert_eq!(
            state.record_failure(),
            RetryDecision::Retry {
                attempt: 1,
                delay: Duration::from_millis(15_000)
            }
        );
        assert_eq!(
            state.record_failure(),
            RetryDecision::Retry {
                attempt: 2,
                delay: Duration::from_millis(30_000)
            }
        );
        assert_eq!(
            state.record_failure(),
            RetryDecision::Retry {
                attempt: 3,
                delay: Duration::from_millis(45_000)
            }
        );

        // Fourth consecutive failure: no immediate retry, ledger reset.
        assert_eq!(state.record_failure(), RetryDecision::Defer);
        assert_eq!(state.retry_count(), 0);
        assert!(state.tick_allowed());
    }

    #[test]
    fn pending_retries_suppress_the_tick() {
        let mut state = ScanState::new();
        state.record_failure();
        assert!(!state.tick_allowed());
        state.clear_retries();
        assert!(state.tick_allowed());
    }

    #[test]
    fn window_note_survives_failures() {
        let mut state = ScanState::new();
        assert!(state.last_scan_time().is_none());
        let t = Utc::now();
        state.begin_attempt(false);
        state.note_window_planned(t);
        state.record_failure();
        state.finish_attempt();
        // The retry no longer counts as a first scan.
        assert_eq!(state.last_scan_time(), Some(t));
    }

    #[test]
    fn started_latch_fires_once() {
        let mut state = ScanState::new();
        assert!(state.mark_started());
        assert!(!state.mark_started());
        assert!(!state.mark_started());
    }
}
