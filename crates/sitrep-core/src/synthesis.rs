//! Report synthesis via the inference service.
//!
//! One synthesis call carries the full scan context: the analysis window,
//! the raw feed text, the key items already reported, and the weapon
//! catalog. The response is constrained by a JSON schema; the shape check
//! and field repair happen downstream in the normalizer.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::error::EngineError;
use crate::inference::{InferenceClient, InferenceRequest};
use crate::report::{CatalogEntry, NO_UPDATES_SENTINEL};
use crate::window::TimeWindow;

/// Deadline for one synthesis call.
pub const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

/// Minimum per-event confidence for inclusion, where the feed provides one.
const MIN_EVENT_CONFIDENCE: f64 = 0.7;

/// Hard cap on the bulletin headline.
const BULLETIN_MAX_CHARS: usize = 350;

pub struct Synthesizer {
    inference: Arc<dyn InferenceClient>,
    timeout: Duration,
}

impl Synthesizer {
    pub fn new(inference: Arc<dyn InferenceClient>) -> Self {
        Self {
            inference,
            timeout: SYNTHESIS_TIMEOUT,
        }
    }

    /// Submit the scan context and return the raw (unchecked) result.
    ///
    /// Errors: [`EngineError::SynthesisTimeout`] when the deadline wins,
    /// [`EngineError::Synthesis`] when the service itself fails. Shape
    /// problems are left for the caller so that a settled-but-malformed
    /// response is distinguishable from a failed call.
    pub async fn synthesize(
        &self,
        window: &TimeWindow,
        raw_feed: &str,
        prior_key_items: &[String],
        catalog: &[CatalogEntry],
    ) -> Result<Value, EngineError> {
        let request = InferenceRequest::structured(
            build_prompt(window, raw_feed, prior_key_items, catalog),
            response_schema(),
        );

        let response = tokio::time::timeout(self.timeout, self.inference.invoke(request))
            .await
            .map_err(|_| EngineError::SynthesisTimeout)??;

        Ok(response.into_value())
    }
}

fn build_prompt(
    window: &TimeWindow,
    raw_feed: &str,
    prior_key_items: &[String],
    catalog: &[CatalogEntry],
) -> String {
    let input = json!({
        "time_window_start": window.start.to_rfc3339(),
        "time_window_end": window.end.to_rfc3339(),
        "events": raw_feed,
        "previous_key_items": prior_key_items,
        "weapons_catalog": catalog,
    });

    format!(
        "Your task: produce a factual situation report on developments \
between Israel and Iran inside the exact time window supplied.\n\
\n\
## Input (raw data, JSON)\n\
{input}\n\
\n\
## Iron rules\n\
1. Use only events inside [time_window_start, time_window_end].\n\
2. If an event carries a \"confidence\" field, include it only when the \
value is at least {MIN_EVENT_CONFIDENCE}.\n\
3. Never repeat anything from previous_key_items; report only what is new.\n\
4. Do not invent causal links that the data does not state explicitly.\n\
5. If no qualifying events exist, fill each of israel_actions, \
enemy_actions and general_updates with the exact string: \
\"{NO_UPDATES_SENTINEL}\".\n\
6. bulletin_text must be at most {BULLETIN_MAX_CHARS} characters and \
contain no exclamation marks.\n\
\n\
## Locations and weapons (mandatory)\n\
- Scan the text for every place name (city, region, facility) and add it \
to mentioned_locations with precise coordinates.\n\
- Identify every weapon or munition mentioned and cross-reference it \
against weapons_catalog, using the catalog id as weapon_id.\n\
- If a location or weapon is not explicitly mentioned, do not include it; \
return empty arrays when there are none."
    )
}

/// The structured output contract: fixed field set, closed enum domains.
fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "bulletin_text": { "type": "string" },
            "key_items": { "type": "array", "items": { "type": "string" } },
            "israel_actions": { "type": "string" },
            "enemy_actions": { "type": "string" },
            "general_updates": { "type": "string" },
            "hfc_guidelines": { "type": "string" },
            "status": { "type": "string", "enum": ["green", "yellow", "red"] },
            "mentioned_locations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "lat": { "type": "number" },
                        "lng": { "type": "number" },
                        "category": {
                            "type": "string",
                            "enum": [
                                "israel_actions",
                                "enemy_actions",
                                "general_updates",
                                "hfc_guidelines"
                            ]
                        }
                    },
                    "required": ["name", "lat", "lng", "category"]
                }
            },
            "mentioned_weapons": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "weapon_id": { "type": "string" },
                        "category": {
                            "type": "string",
                            "enum": [
                                "israel_actions",
                                "enemy_actions",
                                "general_updates"
                            ]
                        }
                    },
                    "required": ["name", "weapon_id", "category"]
                }
            },
            "is_verified": { "type": "boolean" },
            "confidence_level": { "type": "number" },
            "tags": { "type": "array", "items": { "type": "string" } }
        },
        "required": [
            "bulletin_text",
            "key_items",
            "israel_actions",
            "enemy_actions",
            "general_updates",
            "hfc_guidelines",
            "status"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceError, InferenceResponse};
    use crate::window::plan_window;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct CapturePrompt {
        seen: Mutex<Option<InferenceRequest>>,
        reply: Value,
    }

    #[async_trait]
    impl InferenceClient for CapturePrompt {
        async fn invoke(
            &self,
            request: InferenceRequest,
        ) -> Result<InferenceResponse, InferenceError> {
            let reply = self.reply.clone();
            *self.seen.lock().unwrap() = Some(request);
            Ok(InferenceResponse::Structured(reply))
        }
    }

    struct HungService;

    #[async_trait]
    impl InferenceClient for HungService {
        async fn invoke(
            &self,
            _request: InferenceRequest,
        ) -> Result<InferenceResponse, InferenceError> {
            std::future::pending().await
        }
    }

    struct ChattyService;

    #[async_trait]
    impl InferenceClient for ChattyService {
        async fn invoke(
            &self,
            _request: InferenceRequest,
        ) -> Result<InferenceResponse, InferenceError> {
            Ok(InferenceResponse::Text("I could not find anything.".into()))
        }
    }

    #[tokio::test]
    async fn prompt_carries_window_and_context() {
        let client = Arc::new(CapturePrompt {
            seen: Mutex::new(None),
            reply: json!({"status": "green"}),
        });
        let synth = Synthesizer::new(client.clone());
        let window = plan_window(Utc::now(), 15, None);
        let catalog = vec![CatalogEntry {
            id: "w-9".into(),
            name: "Fateh-110".into(),
        }];
        let prior = vec!["strike reported near Esfahan".to_string()];

        synth
            .synthesize(&window, "date,title\n...", &prior, &catalog)
            .await
            .unwrap();

        let req = client.seen.lock().unwrap().take().unwrap();
        assert!(req.add_context_from_internet);
        assert!(req.prompt.contains(&window.start.to_rfc3339()));
        assert!(req.prompt.contains(&window.end.to_rfc3339()));
        assert!(req.prompt.contains("strike reported near Esfahan"));
        assert!(req.prompt.contains("Fateh-110"));
        assert!(req.prompt.contains(NO_UPDATES_SENTINEL));

        let schema = req.response_json_schema.unwrap();
        assert_eq!(schema["properties"]["status"]["enum"][0], "green");
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 7);
    }

    #[tokio::test]
    async fn text_reply_passes_through_as_string_value() {
        // The shape check lives in the controller; a text reply must
        // surface as a JSON string, not an error here.
        let synth = Synthesizer::new(Arc::new(ChattyService));
        let window = plan_window(Utc::now(), 15, None);
        let value = synth.synthesize(&window, "x", &[], &[]).await.unwrap();
        assert!(value.is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_maps_to_synthesis_timeout() {
        let mut synth = Synthesizer::new(Arc::new(HungService));
        synth.timeout = Duration::from_millis(20);
        let window = plan_window(Utc::now(), 15, None);
        let err = synth.synthesize(&window, "x", &[], &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::SynthesisTimeout));
    }
}
