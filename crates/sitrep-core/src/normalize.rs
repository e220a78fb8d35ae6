//! Raw synthesis result repair.
//!
//! The inference service is contractually bound to the response schema but
//! not trusted to honor it. `normalize` is deterministic and total: any
//! JSON value in, a complete [`Report`] out. Absent, null and empty
//! required fields are repaired; array fields are coerced; the two scan
//! tags are appended last.

use serde_json::Value;

use crate::report::{
    AlertStatus, MentionCategory, MentionedLocation, MentionedWeapon, Report,
    DEFAULT_CONFIDENCE, NO_UPDATES_SENTINEL,
};

/// A repaired report plus the "anything new in this window" verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReport {
    pub report: Report,
    /// False iff all three narrative fields contain the sentinel phrase.
    /// Containment, not equality: a narrative sentence that embeds the
    /// sentinel counts as "no updates". Preserved as observed behavior.
    pub has_updates: bool,
}

/// Repair `raw` into a complete report for scan number `scan_count` under
/// the configured (not effective) `interval_min`.
pub fn normalize(raw: &Value, interval_min: u32, scan_count: u64) -> NormalizedReport {
    let bulletin_text = narrative(raw, "bulletin_text", "");
    let key_items = string_array(raw.get("key_items"));
    let israel_actions = narrative(raw, "israel_actions", NO_UPDATES_SENTINEL);
    let enemy_actions = narrative(raw, "enemy_actions", NO_UPDATES_SENTINEL);
    let general_updates = narrative(raw, "general_updates", NO_UPDATES_SENTINEL);
    let hfc_guidelines = narrative(raw, "hfc_guidelines", "");

    let status = raw
        .get("status")
        .and_then(|v| serde_json::from_value::<AlertStatus>(v.clone()).ok())
        .unwrap_or_default();

    let mentioned_locations = entry_array::<MentionedLocation>(raw.get("mentioned_locations"));
    let mentioned_weapons = entry_array::<MentionedWeapon>(raw.get("mentioned_weapons"));

    let mut tags = string_array(raw.get("tags"));
    tags.push(format!("{interval_min}min"));
    tags.push(format!("scan_{scan_count}"));

    let is_verified = raw
        .get("is_verified")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let confidence_level = raw
        .get("confidence_level")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_CONFIDENCE);

    let has_updates = !(israel_actions.contains(NO_UPDATES_SENTINEL)
        && enemy_actions.contains(NO_UPDATES_SENTINEL)
        && general_updates.contains(NO_UPDATES_SENTINEL));

    NormalizedReport {
        report: Report {
            bulletin_text,
            key_items,
            israel_actions,
            enemy_actions,
            general_updates,
            hfc_guidelines,
            status,
            is_verified,
            confidence_level,
            tags,
            mentioned_locations,
            mentioned_weapons,
        },
        has_updates,
    }
}

/// A required string field. Absent, null, non-string and empty all count
/// as missing and yield `fallback`.
fn narrative(raw: &Value, field: &str, fallback: &str) -> String {
    match raw.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => fallback.to_string(),
    }
}

/// Coerce to an array of strings; anything else becomes empty. Non-string
/// elements are dropped.
fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Coerce to an array of typed entries; a non-array becomes empty and
/// individually malformed entries are dropped.
fn entry_array<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
