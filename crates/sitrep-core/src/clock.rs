//! Authoritative time acquisition.
//!
//! The local clock may be unreliable in the deployment environment, while
//! the inference service has implicit access to network time. So the clock
//! source first asks the service for the current UTC time and falls back
//! to the local clock on any failure. It never fails.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::inference::{InferenceClient, InferenceRequest, InferenceResponse};

const TIME_PROMPT: &str = "What is the current date and time right now? \
Provide it in ISO 8601 format (YYYY-MM-DDTHH:MM:SSZ) in UTC timezone. \
Return only the timestamp, nothing else.";

pub struct ClockSource {
    inference: Arc<dyn InferenceClient>,
}

impl ClockSource {
    pub fn new(inference: Arc<dyn InferenceClient>) -> Self {
        Self { inference }
    }

    /// Resolve the current time, preferring the remote answer.
    pub async fn authoritative_time(&self) -> DateTime<Utc> {
        match self.remote_time().await {
            Ok(t) => {
                tracing::debug!(time = %t, "authoritative time acquired");
                t
            }
            Err(reason) => {
                tracing::warn!(%reason, "falling back to the local clock");
                Utc::now()
            }
        }
    }

    async fn remote_time(&self) -> Result<DateTime<Utc>, String> {
        let resp = self
            .inference
            .invoke(InferenceRequest::text(TIME_PROMPT))
            .await
            .map_err(|e| e.to_string())?;

        let text = match resp {
            InferenceResponse::Text(t) => t,
            InferenceResponse::Structured(_) => {
                return Err("expected a plain timestamp".into());
            }
        };

        DateTime::parse_from_rfc3339(text.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| format!("invalid timestamp {:?}: {e}", text.trim()))
    }
}
