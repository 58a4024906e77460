use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use traceos_types::GutState;

use crate::critic::GutCritic;

/// Process-global per-session map of valuation engines. One `GutCritic` per
/// active session; sessions are created lazily on first touch and removed
/// explicitly on session end — nothing here evicts on a timer.
#[derive(Clone)]
pub struct GutRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<GutCritic>>>>>,
    max_events: usize,
    decay: f64,
    min_dwell_secs: f64,
}

impl GutRegistry {
    pub fn new(max_events: usize, decay: f64, min_dwell_secs: f64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_events,
            decay,
            min_dwell_secs,
        }
    }

    fn entry(&self, session_id: &str) -> Arc<Mutex<GutCritic>> {
        if let Some(critic) = self.sessions.read().expect("GutRegistry lock poisoned").get(session_id) {
            return critic.clone();
        }
        let mut sessions = self.sessions.write().expect("GutRegistry lock poisoned");
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(GutCritic::new(self.max_events, self.decay, self.min_dwell_secs))))
            .clone()
    }

    /// Ingest a batch of resonance events for a session, creating the
    /// session's critic on first touch.
    pub fn ingest_batch(&self, session_id: &str, events: Vec<traceos_types::ResonanceEvent>) -> GutState {
        let critic = self.entry(session_id);
        let mut critic = critic.lock().expect("GutCritic lock poisoned");
        critic.ingest_batch(events)
    }

    /// Read-only snapshot of a session's state. Returns the default (Calm,
    /// zeroed) state if the session has never ingested anything.
    pub fn state(&self, session_id: &str) -> GutState {
        let critic = self.entry(session_id);
        let critic = critic.lock().expect("GutCritic lock poisoned");
        critic.state()
    }

    /// Reset a session's valuation state without removing it from the
    /// registry — the next ingest picks up fresh.
    pub fn clear(&self, session_id: &str) {
        let critic = self.entry(session_id);
        let mut critic = critic.lock().expect("GutCritic lock poisoned");
        critic.clear();
    }

    /// Drop a session's critic entirely, e.g. on session teardown.
    pub fn remove(&self, session_id: &str) {
        self.sessions
            .write()
            .expect("GutRegistry lock poisoned")
            .remove(session_id);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().expect("GutRegistry lock poisoned").len()
    }
}

impl Default for GutRegistry {
    fn default() -> Self {
        Self::new(100, 0.95, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traceos_types::MoodState;

    fn event(kind: &str, latency_ms: Option<f64>) -> traceos_types::ResonanceEvent {
        traceos_types::ResonanceEvent {
            event_type: kind.into(),
            timestamp: 0.0,
            session_id: "s1".into(),
            latency_ms,
            erratic_input: None,
            context: None,
        }
    }

    #[test]
    fn unknown_session_reads_default_calm_state() {
        let registry = GutRegistry::default();
        let state = registry.state("never-touched");
        assert_eq!(state.mood, MoodState::Calm);
        assert_eq!(state.frustration_index, 0.0);
    }

    #[test]
    fn sessions_are_isolated() {
        let registry = GutRegistry::default();
        registry.ingest_batch("a", vec![event("undo", Some(100.0))]);
        let a = registry.state("a");
        let b = registry.state("b");
        assert!(a.frustration_index > 0.0);
        assert_eq!(b.frustration_index, 0.0);
    }

    #[test]
    fn remove_drops_session_state() {
        let registry = GutRegistry::default();
        registry.ingest_batch("a", vec![event("undo", Some(100.0))]);
        registry.remove("a");
        assert_eq!(registry.state("a").frustration_index, 0.0);
    }

    #[test]
    fn session_count_tracks_distinct_sessions() {
        let registry = GutRegistry::default();
        registry.ingest_batch("a", vec![event("pause_detected", None)]);
        registry.ingest_batch("b", vec![event("pause_detected", None)]);
        assert_eq!(registry.session_count(), 2);
    }
}
