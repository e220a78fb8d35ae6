mod engine;
mod state;

pub use engine::{EngineHandle, ScanEngine, ScanOutcome};
pub use state::{RetryDecision, ScanState, MAX_RETRIES, RETRY_STEP};
