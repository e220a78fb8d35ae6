//! Notification preparation.
//!
//! Delivery is the host's job; this module only decides whether a
//! published report warrants a notification and what it should say.
//! Host-global permission state is abstracted as an injected
//! [`NotificationGate`] capability rather than queried ad hoc.

use serde::{Deserialize, Serialize};

use crate::report::{AlertStatus, NO_UPDATES_SENTINEL, StoredReport};

/// Longest excerpt taken from a narrative field into the body.
const EXCERPT_LEN: usize = 50;

/// Host notification-permission capability.
pub trait NotificationGate: Send + Sync {
    /// Whether the host currently permits notifications.
    fn granted(&self) -> bool;

    /// Ask the host for permission. Returns the resulting grant state.
    fn request_permission(&self) -> bool {
        self.granted()
    }
}

/// Fixed grant state, for hosts without a permission dialog.
pub struct StaticGate {
    pub granted: bool,
}

impl NotificationGate for StaticGate {
    fn granted(&self) -> bool {
        self.granted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Normal,
    High,
}

/// What the host should show for one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub urgency: Urgency,
    /// High-urgency notifications stay on screen until acted upon.
    pub sticky: bool,
    pub report_id: String,
}

/// Decides which reports become notifications.
///
/// Keeps a last-seen-report latch: the first report observed after startup
/// is swallowed (it is history, not news), and the same report is never
/// announced twice.
pub struct NotificationPlanner {
    gate: Box<dyn NotificationGate>,
    last_report_id: Option<String>,
}

impl NotificationPlanner {
    pub fn new(gate: Box<dyn NotificationGate>) -> Self {
        Self {
            gate,
            last_report_id: None,
        }
    }

    /// Returns the notification to deliver for `report`, or `None` when
    /// the gate denies, the report was already announced, or this is the
    /// first report seen.
    pub fn plan(&mut self, report: &StoredReport) -> Option<NotificationContent> {
        if self.last_report_id.as_deref() == Some(report.id.as_str()) {
            return None;
        }
        let first_seen = self.last_report_id.is_none();
        self.last_report_id = Some(report.id.clone());

        if first_seen || !self.gate.granted() {
            return None;
        }
        Some(content_for(report))
    }
}

fn content_for(report: &StoredReport) -> NotificationContent {
    let (title, urgency) = match report.report.status {
        AlertStatus::Red => ("severe security report", Urgency::High),
        AlertStatus::Yellow => ("tense security report", Urgency::Normal),
        AlertStatus::Green => ("security update", Urgency::Low),
    };

    let mut lines = Vec::new();
    for field in [
        &report.report.israel_actions,
        &report.report.enemy_actions,
        &report.report.hfc_guidelines,
    ] {
        if !field.is_empty() && !field.contains(NO_UPDATES_SENTINEL) {
            lines.push(excerpt(field));
        }
    }

    let body = if lines.is_empty() {
        "a new security update is available".to_string()
    } else {
        lines.join("\n")
    };

    NotificationContent {
        title: title.to_string(),
        body,
        urgency,
        sticky: urgency == Urgency::High,
        report_id: report.id.clone(),
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_LEN {
        text.to_string()
    } else {
        let cut: String = text.chars().take(EXCERPT_LEN).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Report;
    use chrono::Utc;

    fn stored(id: &str, status: AlertStatus, enemy: &str) -> StoredReport {
        StoredReport {
            id: id.into(),
            created_at: Utc::now(),
            report: Report {
                bulletin_text: String::new(),
                key_items: vec![],
                israel_actions: NO_UPDATES_SENTINEL.into(),
                enemy_actions: enemy.into(),
                general_updates: NO_UPDATES_SENTINEL.into(),
                hfc_guidelines: String::new(),
                status,
                is_verified: false,
                confidence_level: 5.0,
                tags: vec![],
                mentioned_locations: vec![],
                mentioned_weapons: vec![],
            },
        }
    }

    #[test]
    fn first_report_is_swallowed() {
        let mut planner = NotificationPlanner::new(Box::new(StaticGate { granted: true }));
        assert!(planner
            .plan(&stored("r-1", AlertStatus::Red, "launches"))
            .is_none());
        assert!(planner
            .plan(&stored("r-2", AlertStatus::Red, "launches"))
            .is_some());
    }

    #[test]
    fn same_report_is_not_announced_twice() {
        let mut planner = NotificationPlanner::new(Box::new(StaticGate { granted: true }));
        planner.plan(&stored("r-1", AlertStatus::Green, "x"));
        planner.plan(&stored("r-2", AlertStatus::Green, "x"));
        assert!(planner.plan(&stored("r-2", AlertStatus::Green, "x")).is_none());
    }

    #[test]
    fn denied_gate_still_advances_the_latch() {
        let mut planner = NotificationPlanner::new(Box::new(StaticGate { granted: false }));
        planner.plan(&stored("r-1", AlertStatus::Red, "launches"));
        assert!(planner
            .plan(&stored("r-2", AlertStatus::Red, "launches"))
            .is_none());
    }

    #[test]
    fn red_reports_are_high_urgency_and_sticky() {
        let mut planner = NotificationPlanner::new(Box::new(StaticGate { granted: true }));
        planner.plan(&stored("r-0", AlertStatus::Green, "x"));
        let content = planner
            .plan(&stored("r-1", AlertStatus::Red, "ballistic launch detected"))
            .unwrap();
        assert_eq!(content.urgency, Urgency::High);
        assert!(content.sticky);
        assert!(content.body.contains("ballistic launch detected"));
    }

    #[test]
    fn sentinel_fields_fall_back_to_generic_body() {
        let mut planner = NotificationPlanner::new(Box::new(StaticGate { granted: true }));
        planner.plan(&stored("r-0", AlertStatus::Green, NO_UPDATES_SENTINEL));
        let content = planner
            .plan(&stored("r-1", AlertStatus::Green, NO_UPDATES_SENTINEL))
            .unwrap();
        assert_eq!(content.body, "a new security update is available");
        assert_eq!(content.urgency, Urgency::Low);
    }

    #[test]
    fn long_fields_are_truncated() {
        let long = "a".repeat(120);
        let mut planner = NotificationPlanner::new(Box::new(StaticGate { granted: true }));
        planner.plan(&stored("r-0", AlertStatus::Green, "x"));
        let content = planner
            .plan(&stored("r-1", AlertStatus::Green, &long))
            .unwrap();
        assert_eq!(content.body, format!("{}...", "a".repeat(50)));
    }
}
