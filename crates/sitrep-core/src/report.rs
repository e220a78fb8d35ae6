//! Report data model.
//!
//! A [`Report`] is the immutable product of one successful scan. The store
//! assigns identity and a creation timestamp, producing a [`StoredReport`]
//! that is forwarded to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The exact phrase a narrative field carries when no qualifying event
/// exists inside the scan window. Matching against it is by substring
/// containment, not equality.
pub const NO_UPDATES_SENTINEL: &str = "no updates in requested window";

/// Default confidence assigned when the synthesis result omits one.
pub const DEFAULT_CONFIDENCE: f64 = 5.0;

/// Overall alert level of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Green,
    Yellow,
    Red,
}

impl Default for AlertStatus {
    fn default() -> Self {
        AlertStatus::Green
    }
}

/// Which narrative section a mentioned entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionCategory {
    IsraelActions,
    EnemyActions,
    GeneralUpdates,
    HfcGuidelines,
}

/// A place name extracted from the feed, with coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionedLocation {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub category: MentionCategory,
}

/// A weapon or munition extracted from the feed, cross-referenced against
/// the catalog. `weapon_id` is passed through as-is; referential integrity
/// against the catalog is not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionedWeapon {
    pub name: String,
    pub weapon_id: String,
    pub category: MentionCategory,
}

/// One entry of the weapon catalog, re-fetched on every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

/// A fully normalized situation report, published once per successful scan
/// whether or not the window contained new information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Headline summary. At most 350 characters, no exclamation marks;
    /// the contract is enforced by the synthesis prompt, not re-validated
    /// here.
    pub bulletin_text: String,
    /// Short facts carried forward into the next synthesis to prevent
    /// repetition.
    pub key_items: Vec<String>,
    pub israel_actions: String,
    pub enemy_actions: String,
    pub general_updates: String,
    pub hfc_guidelines: String,
    pub status: AlertStatus,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default = "default_confidence")]
    pub confidence_level: f64,
    /// Always ends with `"{interval}min"` and `"scan_{n}"`.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mentioned_locations: Vec<MentionedLocation>,
    #[serde(default)]
    pub mentioned_weapons: Vec<MentionedWeapon>,
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

/// A report after the store assigned identity and creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: Report,
}
