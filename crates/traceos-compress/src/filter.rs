use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_COMPRESSION_EVENTS: usize = 500;

const HIGH_PRIORITY: &[&str] = &[
    "session.created",
    "session.updated",
    "provenance.stored",
    "schema.updated",
    "variation.accepted",
    "variation.rejected",
    "user_note.added",
];

const MEDIUM_PRIORITY: &[&str] = &[
    "variation.applied",
    "task.completed",
    "asset.created",
];

/// One raw event pulled from the external event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub event_type: String,
    #[serde(default = "default_actor")]
    pub actor: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: Value,
}

fn default_actor() -> String {
    "system".to_string()
}

/// Keep HIGH-priority events in full and the most recent MEDIUM-priority
/// events up to the 500-event cap; everything else (LOW) is discarded.
/// Survivors are re-sorted by timestamp.
pub fn filter_and_rank(events: Vec<TraceEvent>) -> Vec<TraceEvent> {
    let mut high: Vec<TraceEvent> = events
        .iter()
        .filter(|e| HIGH_PRIORITY.contains(&e.event_type.as_str()))
        .cloned()
        .collect();
    let mut medium: Vec<TraceEvent> = events
        .into_iter()
        .filter(|e| MEDIUM_PRIORITY.contains(&e.event_type.as_str()))
        .collect();

    if high.len() + medium.len() > MAX_COMPRESSION_EVENTS {
        let medium_limit = MAX_COMPRESSION_EVENTS.saturating_sub(high.len());
        if medium_limit == 0 {
            medium.clear();
        } else if medium.len() > medium_limit {
            medium = medium.split_off(medium.len() - medium_limit);
        }
    }

    high.append(&mut medium);
    high.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    high
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str, ts: &str) -> TraceEvent {
        TraceEvent {
            event_type: event_type.into(),
            actor: "system".into(),
            timestamp: ts.into(),
            data: Value::Null,
        }
    }

    #[test]
    fn low_priority_events_are_discarded() {
        let events = vec![event("ui.click", "t1"), event("session.created", "t2")];
        let result = filter_and_rank(events);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].event_type, "session.created");
    }

    #[test]
    fn result_is_sorted_by_timestamp() {
        let events = vec![
            event("session.updated", "2024-01-02T00:00:00"),
            event("session.created", "2024-01-01T00:00:00"),
        ];
        let result = filter_and_rank(events);
        assert_eq!(result[0].event_type, "session.created");
        assert_eq!(result[1].event_type, "session.updated");
    }

    #[test]
    fn over_cap_keeps_all_high_and_trims_oldest_medium() {
        let mut events: Vec<TraceEvent> = (0..5)
            .map(|i| event("session.created", &format!("t{i}")))
            .collect();
        for i in 0..500 {
            events.push(event("task.completed", &format!("m{i:04}")));
        }
        let result = filter_and_rank(events);
        assert_eq!(result.len(), MAX_COMPRESSION_EVENTS);
        let high_count = result.iter().filter(|e| e.event_type == "session.created").count();
        assert_eq!(high_count, 5);
    }

    #[test]
    fn high_at_or_above_cap_drops_all_medium() {
        let mut events: Vec<TraceEvent> = (0..MAX_COMPRESSION_EVENTS)
            .map(|i| event("session.created", &format!("h{i:04}")))
            .collect();
        events.push(event("task.completed", "m0"));
        let result = filter_and_rank(events);
        assert_eq!(result.len(), MAX_COMPRESSION_EVENTS);
        assert!(result.iter().all(|e| e.event_type == "session.created"));
    }
}
